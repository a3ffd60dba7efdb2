//! The `api` stack: REST surface, authorizer, CRUD Lambdas, API key and
//! usage plan, wired to the primary table.

pub mod events;
pub mod gateway;
pub mod tree;

use std::collections::BTreeMap;

use serde_json::json;

use crate::assets::{AssetEntry, AssetSource};
use crate::config::{DeployConfig, EVENT_ACTION_OPERATION};
use crate::error::Result;
use crate::lambda::{FunctionRef, FunctionSpec, Grant, TOPIC_ENV_VAR};
use crate::stack::Stack;
use crate::tables::TableHandle;
use crate::template::{intrinsic, LogicalId, Output};

use events::EventHandlerSpec;
use gateway::GatewayResponseType;
use tree::{Authorization, HttpMethod, Integration, ResourceTree};

pub use tree::RenderedTree;

pub const STACK_NAME: &str = "api";
pub const AUTHORIZER_TARGET: &str = "lambdaAuthorizer";

/// Where a CRUD function is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mount {
    /// `/v1/entity`
    Collection,
    /// `/v1/entity/{entityId}`
    Item,
}

/// A synchronous CRUD function and its route.
#[derive(Debug, Clone, Copy)]
struct CrudRoute {
    target: &'static str,
    method: HttpMethod,
    mount: Mount,
    publishes_events: bool,
}

const CRUD_ROUTES: [CrudRoute; 4] = [
    CrudRoute {
        target: "create",
        method: HttpMethod::Post,
        mount: Mount::Collection,
        publishes_events: true,
    },
    CrudRoute {
        target: "read",
        method: HttpMethod::Get,
        mount: Mount::Item,
        publishes_events: false,
    },
    CrudRoute {
        target: "update",
        method: HttpMethod::Put,
        mount: Mount::Item,
        publishes_events: true,
    },
    CrudRoute {
        target: "delete",
        method: HttpMethod::Delete,
        mount: Mount::Item,
        publishes_events: true,
    },
];

/// Inputs of the `api` stack. The table is borrowed, never owned.
#[derive(Debug, Clone, Copy)]
pub struct ApiProps<'a> {
    pub config: &'a DeployConfig,
    pub primary_table: &'a TableHandle,
    pub assets: &'a AssetSource,
}

/// The synthesized `api` stack.
#[derive(Debug, Clone)]
pub struct Api {
    stack: Stack,
    rest_api: LogicalId,
    authorizer: LogicalId,
    stage: LogicalId,
    tree: ResourceTree,
    functions: BTreeMap<String, FunctionRef>,
    assets: Vec<AssetEntry>,
}

impl Api {
    pub fn new(props: ApiProps<'_>) -> Result<Self> {
        let ApiProps {
            config,
            primary_table,
            assets: source,
        } = props;
        let cors_origin = config.cors_allow_origin_header.as_str();

        let mut stack = Stack::new(
            STACK_NAME,
            config.environment.clone(),
            "REST API, authorizer and CRUD functions for the entity API",
        );
        stack.add_dependency(&primary_table.stack);

        let mut functions = BTreeMap::new();
        let mut assets = Vec::new();
        let mut render = |stack: &mut Stack, spec: FunctionSpec| -> Result<FunctionRef> {
            let rendered = spec.render(stack, source)?;
            assets.push(spec.asset_entry(source));
            functions.insert(spec.target.clone(), rendered.clone());
            Ok(rendered)
        };

        // Authorizer
        let authorizer_fn = render(
            &mut stack,
            FunctionSpec::base("request-authorizer-lambda", AUTHORIZER_TARGET, cors_origin),
        )?;

        let ids = gateway::add_rest_api(&mut stack, STACK_NAME)?;
        let rest_api = ids.rest_api.clone();
        let authorizer = gateway::add_request_authorizer(
            &mut stack,
            "request-authorizer",
            &rest_api,
            &authorizer_fn.function,
        )?;

        let mut tree = ResourceTree::new(&rest_api)?;

        // API Gateway refuses to deploy an authorizer that no method uses, so
        // root carries a mock GET guarded by it.
        let root = tree.root();
        tree.add_method(
            root,
            HttpMethod::Get,
            Integration::Mock,
            Authorization::Custom(authorizer.clone()),
        );

        // Everything the deployment snapshots besides the tree itself.
        let mut snapshot = vec![authorizer.clone()];
        for response_type in [GatewayResponseType::Default4xx, GatewayResponseType::Default5xx] {
            snapshot.push(gateway::add_cors_gateway_response(
                &mut stack,
                &rest_api,
                response_type,
                cors_origin,
            )?);
        }
        snapshot.extend(gateway::add_request_validators(&mut stack, &rest_api)?);

        let topic = if config.event_handlers {
            Some(events::add_topic(&mut stack)?)
        } else {
            None
        };

        // CRUD functions and routes
        let v1 = tree.add_resource(root, "v1")?;
        let entity = tree.add_resource(v1, "entity")?;
        let entity_id = tree.add_resource(entity, "{entityId}")?;

        for route in CRUD_ROUTES {
            let mut spec = FunctionSpec::base(route.target, route.target, cors_origin)
                .connect_table(primary_table);
            if let Some(topic) = topic.as_ref().filter(|_| route.publishes_events) {
                spec = spec
                    .grant(Grant::topic_publish(intrinsic::ref_to(topic)))
                    .with_environment(TOPIC_ENV_VAR, intrinsic::ref_to(topic));
            }
            let function = render(&mut stack, spec)?;

            let node = match route.mount {
                Mount::Collection => entity,
                Mount::Item => entity_id,
            };
            tree.add_method(
                node,
                route.method,
                Integration::Lambda(function.function),
                Authorization::Custom(authorizer.clone()),
            );
        }

        if let Some(topic) = &topic {
            let handler = EventHandlerSpec {
                target: "eventAction".to_string(),
                kebab_name: "event-action".to_string(),
                operations: config
                    .event_operation(EVENT_ACTION_OPERATION)
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
                uses_table: true,
            };
            let function = events::add_event_handler(
                &mut stack,
                &handler,
                topic,
                primary_table,
                cors_origin,
                source,
            )?;
            let spec = FunctionSpec::base(&handler.kebab_name, &handler.target, cors_origin);
            assets.push(spec.asset_entry(source));
            functions.insert(handler.target.clone(), function);
        }

        let rendered = tree.render(&mut stack)?;
        snapshot.extend(rendered.resources);
        snapshot.extend(rendered.methods);
        let stage = gateway::add_deployment(&mut stack, &ids, &snapshot)?;
        gateway::add_usage_plan(&mut stack, &rest_api, &stage)?;

        stack.template.outputs.insert(
            "Endpoint".to_string(),
            Output {
                value: intrinsic::join(
                    "",
                    vec![
                        json!("https://"),
                        intrinsic::ref_to(&rest_api),
                        json!(".execute-api."),
                        intrinsic::pseudo(intrinsic::AWS_REGION),
                        json!("."),
                        intrinsic::pseudo(intrinsic::AWS_URL_SUFFIX),
                        json!("/"),
                        intrinsic::ref_to(&stage),
                        json!("/"),
                    ],
                ),
                description: Some("Invoke URL of the prod stage".to_string()),
                export: None,
            },
        );

        Ok(Self {
            stack,
            rest_api,
            authorizer,
            stage,
            tree,
            functions,
            assets,
        })
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn rest_api(&self) -> &LogicalId {
        &self.rest_api
    }

    pub fn authorizer(&self) -> &LogicalId {
        &self.authorizer
    }

    pub fn stage(&self) -> &LogicalId {
        &self.stage
    }

    /// Rendered function for a build target.
    pub fn function(&self, target: &str) -> Option<&FunctionRef> {
        self.functions.get(target)
    }

    /// Build targets of every function in the stack.
    pub fn targets(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// `(path, method)` pairs served by the API, preflight excluded.
    pub fn routes(&self) -> Vec<(&str, HttpMethod)> {
        self.tree.routes()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.tree.paths()
    }

    pub fn asset_entries(&self) -> &[AssetEntry] {
        &self.assets
    }

    pub fn into_parts(self) -> (Stack, Vec<AssetEntry>) {
        (self.stack, self.assets)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::config::Environment;
    use crate::lambda::{CORS_ENV_VAR, TABLE_ENV_VAR};
    use crate::tables::Tables;

    const ORIGIN: &str = "https://app.example.com";

    fn config() -> DeployConfig {
        DeployConfig::new(Environment::new("123456789012", "us-east-1"), ORIGIN)
    }

    fn source() -> AssetSource {
        AssetSource::new("src", "0123456789abcdef").unwrap()
    }

    fn build(config: &DeployConfig) -> (Tables, Api) {
        let tables = Tables::new(config.environment.clone()).unwrap();
        let source = source();
        let api = Api::new(ApiProps {
            config,
            primary_table: tables.primary_table(),
            assets: &source,
        })
        .unwrap();
        (tables, api)
    }

    fn variables<'a>(api: &'a Api, target: &str) -> &'a Value {
        let function = api.function(target).unwrap();
        &api.stack()
            .template
            .resource(function.function.as_str())
            .unwrap()
            .property("Environment")
            .unwrap()["Variables"]
    }

    #[test]
    fn test_resource_counts() {
        let (_, api) = build(&config());
        let template = &api.stack().template;

        assert_eq!(template.count_of_type("AWS::ApiGateway::RestApi"), 1);
        assert_eq!(template.count_of_type("AWS::ApiGateway::Authorizer"), 1);
        assert_eq!(template.count_of_type("AWS::ApiGateway::UsagePlan"), 1);
        assert_eq!(template.count_of_type("AWS::ApiGateway::ApiKey"), 1);
        assert_eq!(template.count_of_type("AWS::Lambda::Function"), 5);
        assert_eq!(template.count_of_type("AWS::SNS::Topic"), 0);
        assert_eq!(
            api.targets(),
            vec!["create", "delete", "lambdaAuthorizer", "read", "update"]
        );
    }

    #[test]
    fn test_depends_on_tables_stack() {
        let (_, api) = build(&config());
        assert_eq!(api.stack().dependencies, vec!["tables".to_string()]);
    }

    #[test]
    fn test_every_function_gets_cors_origin() {
        let (_, api) = build(&config());
        for target in api.targets() {
            assert_eq!(variables(&api, target)[CORS_ENV_VAR], json!(ORIGIN));
        }
    }

    #[test]
    fn test_crud_functions_connected_to_table() {
        let (tables, api) = build(&config());
        let table = tables.primary_table();

        for target in ["create", "read", "update", "delete"] {
            assert_eq!(variables(&api, target)[TABLE_ENV_VAR], table.table_name());
            assert!(variables(&api, target).get(TOPIC_ENV_VAR).is_none());

            let function = api.function(target).unwrap();
            let policy_id = function.role.child("default-policy").unwrap();
            let policy = api.stack().template.resource(policy_id.as_str()).unwrap();
            let statements = policy.property("PolicyDocument").unwrap()["Statement"]
                .as_array()
                .unwrap();
            assert_eq!(statements.len(), 1);
            assert_eq!(statements[0]["Action"], json!("dynamodb:*"));
            assert_eq!(statements[0]["Resource"], table.table_arn());
        }

        // The authorizer never touches the table.
        assert!(variables(&api, AUTHORIZER_TARGET).get(TABLE_ENV_VAR).is_none());
    }

    #[test]
    fn test_routes() {
        let (_, api) = build(&config());

        assert_eq!(
            api.paths(),
            vec!["/", "/v1", "/v1/entity", "/v1/entity/{entityId}"]
        );
        assert_eq!(
            api.routes(),
            vec![
                ("/", HttpMethod::Get),
                ("/v1/entity", HttpMethod::Post),
                ("/v1/entity/{entityId}", HttpMethod::Get),
                ("/v1/entity/{entityId}", HttpMethod::Put),
                ("/v1/entity/{entityId}", HttpMethod::Delete),
            ]
        );
    }

    #[test]
    fn test_every_non_preflight_method_uses_the_authorizer() {
        let (_, api) = build(&config());
        let authorizer = intrinsic::ref_to(api.authorizer());

        let methods: Vec<_> = api
            .stack()
            .template
            .resources_of_type("AWS::ApiGateway::Method")
            .filter(|(_, m)| m.property("HttpMethod") != Some(&json!("OPTIONS")))
            .collect();
        assert_eq!(methods.len(), 5);

        for (id, method) in methods {
            assert_eq!(
                method.property("AuthorizationType"),
                Some(&json!("CUSTOM")),
                "{id}"
            );
            assert_eq!(method.property("AuthorizerId"), Some(&authorizer), "{id}");
        }
    }

    #[test]
    fn test_root_get_is_mock() {
        let (_, api) = build(&config());
        let root_get = api.stack().template.resource("ApiRootGet").unwrap();
        assert_eq!(
            root_get.property("Integration"),
            Some(&json!({ "Type": "MOCK" }))
        );
    }

    #[test]
    fn test_gateway_responses_carry_cors_headers() {
        let (_, api) = build(&config());
        let responses: Vec<_> = api
            .stack()
            .template
            .resources_of_type("AWS::ApiGateway::GatewayResponse")
            .map(|(_, r)| r)
            .collect();
        assert_eq!(responses.len(), 2);

        for response in responses {
            let params = response.property("ResponseParameters").unwrap();
            assert_eq!(
                params["gatewayresponse.header.Access-Control-Allow-Origin"],
                json!(format!("'{}'", ORIGIN))
            );
            assert_eq!(
                params["gatewayresponse.header.Access-Control-Allow-Credentials"],
                json!("'true'")
            );
        }
    }

    #[test]
    fn test_assets_for_every_function() {
        let (_, api) = build(&config());
        let targets: Vec<&str> = api
            .asset_entries()
            .iter()
            .map(|a| a.target.as_str())
            .collect();
        assert_eq!(
            targets,
            vec!["lambdaAuthorizer", "create", "read", "update", "delete"]
        );
    }

    #[test]
    fn test_event_handlers_enabled() {
        let config = config().with_event_handlers([(EVENT_ACTION_OPERATION, "eventAction")]);
        let (_, api) = build(&config);
        let template = &api.stack().template;

        assert_eq!(template.count_of_type("AWS::SNS::Topic"), 1);
        assert_eq!(template.count_of_type("AWS::SQS::Queue"), 1);
        assert_eq!(template.count_of_type("AWS::SNS::Subscription"), 1);
        assert_eq!(template.count_of_type("AWS::Lambda::Function"), 6);
        assert!(api.function("eventAction").is_some());

        let topic = json!({ "Ref": "PrimaryTopic" });
        for target in ["create", "update", "delete"] {
            assert_eq!(variables(&api, target)[TOPIC_ENV_VAR], topic);
        }
        assert!(variables(&api, "read").get(TOPIC_ENV_VAR).is_none());

        let policy = template.resource("CreateServiceRoleDefaultPolicy").unwrap();
        let statements = policy.property("PolicyDocument").unwrap()["Statement"]
            .as_array()
            .unwrap();
        assert!(statements
            .iter()
            .any(|s| s["Action"] == json!("sns:Publish") && s["Resource"] == topic));

        assert!(api
            .asset_entries()
            .iter()
            .any(|a| a.target == "eventAction"));
    }

    #[test]
    fn test_endpoint_output() {
        let (_, api) = build(&config());
        let output = api.stack().template.outputs.get("Endpoint").unwrap();
        assert!(output.export.is_none());
        let parts = output.value["Fn::Join"][1].as_array().unwrap();
        assert!(parts.contains(&json!({ "Ref": "ApiDeploymentStageProd" })));
    }

    fn deployment(api: &Api) -> (&str, &crate::template::Resource) {
        let mut deployments = api
            .stack()
            .template
            .resources_of_type("AWS::ApiGateway::Deployment");
        let found = deployments.next().unwrap();
        assert!(deployments.next().is_none());
        found
    }

    #[test]
    fn test_deployment_waits_for_everything_it_snapshots() {
        let (_, api) = build(&config());
        let (_, deployment) = deployment(&api);

        for id in [
            "Default4xxGatewayResponse",
            "Default5xxGatewayResponse",
            "RequestAuthorizer",
            "ApiValidateBody",
            "ApiValidateParams",
            "ApiV1EntityEntityId",
            "ApiRootGet",
            "ApiV1EntityPost",
        ] {
            assert!(deployment.depends_on.contains(id), "{id}");
        }
    }

    #[test]
    fn test_deployment_id_tracks_api_content() {
        let (_, first) = build(&config());
        let (_, again) = build(&config());
        assert_eq!(deployment(&first).0, deployment(&again).0);

        let mut other = config();
        other.cors_allow_origin_header = "https://other.example.com".to_string();
        let (_, changed) = build(&other);
        assert_ne!(deployment(&first).0, deployment(&changed).0);

        let stage = changed
            .stack()
            .template
            .resource("ApiDeploymentStageProd")
            .unwrap();
        assert_eq!(
            stage.property("DeploymentId"),
            Some(&json!({ "Ref": deployment(&changed).0 }))
        );
    }
}
