//! REST resource tree, methods and CORS preflight.

use std::fmt;

use serde_json::{json, Value};

use crate::error::{Result, SynthError};
use crate::stack::Stack;
use crate::template::{intrinsic, LogicalId, Resource};

const PREFLIGHT_ALLOW_HEADERS: &str =
    "'Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent'";
const PREFLIGHT_ALLOW_METHODS: &str = "'OPTIONS,GET,PUT,POST,DELETE,PATCH,HEAD'";
const PREFLIGHT_STATUS: &str = "204";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend a method forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integration {
    /// Answered by API Gateway itself.
    Mock,
    /// Lambda proxy integration.
    Lambda(LogicalId),
}

/// Access control of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    None,
    Custom(LogicalId),
}

/// Index of a node in a [`ResourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    logical_id: LogicalId,
    path: String,
    path_part: Option<String>,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Method {
    node: NodeId,
    http_method: HttpMethod,
    integration: Integration,
    authorization: Authorization,
}

/// The path hierarchy of a REST API and the methods attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTree {
    rest_api: LogicalId,
    nodes: Vec<Node>,
    methods: Vec<Method>,
}

/// Logical ids produced by rendering a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTree {
    pub resources: Vec<LogicalId>,
    pub methods: Vec<LogicalId>,
}

impl ResourceTree {
    pub fn new(rest_api: &LogicalId) -> Result<Self> {
        Ok(Self {
            rest_api: rest_api.clone(),
            nodes: vec![Node {
                logical_id: rest_api.child("root")?,
                path: "/".to_string(),
                path_part: None,
                parent: None,
            }],
            methods: Vec::new(),
        })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a child path segment under `parent`.
    pub fn add_resource(&mut self, parent: NodeId, path_part: &str) -> Result<NodeId> {
        let parent_node = &self.nodes[parent.0];
        let logical_id = if parent_node.parent.is_none() {
            self.rest_api.child(path_part)?
        } else {
            parent_node.logical_id.child(path_part)?
        };
        let path = if parent_node.path == "/" {
            format!("/{}", path_part)
        } else {
            format!("{}/{}", parent_node.path, path_part)
        };

        if self.nodes.iter().any(|n| n.path == path) {
            return Err(SynthError::DuplicatePath(path));
        }

        self.nodes.push(Node {
            logical_id,
            path,
            path_part: Some(path_part.to_string()),
            parent: Some(parent),
        });
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn add_method(
        &mut self,
        node: NodeId,
        http_method: HttpMethod,
        integration: Integration,
        authorization: Authorization,
    ) {
        self.methods.push(Method {
            node,
            http_method,
            integration,
            authorization,
        });
    }

    /// Every path in the tree, root first.
    pub fn paths(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.path.as_str()).collect()
    }

    /// `(path, method)` pairs in insertion order, preflight excluded.
    pub fn routes(&self) -> Vec<(&str, HttpMethod)> {
        self.methods
            .iter()
            .map(|m| (self.nodes[m.node.0].path.as_str(), m.http_method))
            .collect()
    }

    /// Adds resources, preflight `OPTIONS` methods, methods and invoke permissions.
    pub fn render(&self, stack: &mut Stack) -> Result<RenderedTree> {
        let mut rendered = RenderedTree::default();

        for (index, node) in self.nodes.iter().enumerate() {
            if let (Some(parent), Some(path_part)) = (node.parent, &node.path_part) {
                stack.add(
                    &node.logical_id,
                    Resource::new(
                        "AWS::ApiGateway::Resource",
                        json!({
                            "ParentId": self.resource_id(parent),
                            "PathPart": path_part,
                            "RestApiId": intrinsic::ref_to(&self.rest_api),
                        }),
                    ),
                )?;
                rendered.resources.push(node.logical_id.clone());
            }

            let options_id = node.logical_id.child("options")?;
            stack.add(&options_id, self.preflight_method(NodeId(index)))?;
            rendered.methods.push(options_id);
        }

        for method in &self.methods {
            let node = &self.nodes[method.node.0];
            let method_id = node
                .logical_id
                .child(&method.http_method.as_str().to_ascii_lowercase())?;

            stack.add(&method_id, self.method_resource(method))?;

            if let Integration::Lambda(function) = &method.integration {
                stack.add(
                    &method_id.child("permission")?,
                    Resource::new(
                        "AWS::Lambda::Permission",
                        json!({
                            "Action": "lambda:InvokeFunction",
                            "FunctionName": intrinsic::get_att(function, "Arn"),
                            "Principal": "apigateway.amazonaws.com",
                            "SourceArn": intrinsic::execute_api_arn(
                                &self.rest_api,
                                vec![json!(format!(
                                    "/*/{}{}",
                                    method.http_method,
                                    permission_path(&node.path)
                                ))],
                            ),
                        }),
                    ),
                )?;
            }

            rendered.methods.push(method_id);
        }

        Ok(rendered)
    }

    fn resource_id(&self, node: NodeId) -> Value {
        let node = &self.nodes[node.0];
        if node.parent.is_none() {
            intrinsic::get_att(&self.rest_api, "RootResourceId")
        } else {
            intrinsic::ref_to(&node.logical_id)
        }
    }

    fn method_resource(&self, method: &Method) -> Resource {
        let mut properties = json!({
            "HttpMethod": method.http_method.as_str(),
            "ResourceId": self.resource_id(method.node),
            "RestApiId": intrinsic::ref_to(&self.rest_api),
        });

        match &method.authorization {
            Authorization::None => {
                properties["AuthorizationType"] = json!("NONE");
            }
            Authorization::Custom(authorizer) => {
                properties["AuthorizationType"] = json!("CUSTOM");
                properties["AuthorizerId"] = intrinsic::ref_to(authorizer);
            }
        }

        properties["Integration"] = match &method.integration {
            Integration::Mock => json!({ "Type": "MOCK" }),
            Integration::Lambda(function) => json!({
                "IntegrationHttpMethod": "POST",
                "Type": "AWS_PROXY",
                "Uri": intrinsic::lambda_invocation_uri(function),
            }),
        };

        Resource::new("AWS::ApiGateway::Method", properties)
    }

    fn preflight_method(&self, node: NodeId) -> Resource {
        Resource::new(
            "AWS::ApiGateway::Method",
            json!({
                "AuthorizationType": "NONE",
                "HttpMethod": HttpMethod::Options.as_str(),
                "ResourceId": self.resource_id(node),
                "RestApiId": intrinsic::ref_to(&self.rest_api),
                "Integration": {
                    "IntegrationResponses": [{
                        "ResponseParameters": {
                            "method.response.header.Access-Control-Allow-Headers": PREFLIGHT_ALLOW_HEADERS,
                            "method.response.header.Access-Control-Allow-Origin": "'*'",
                            "method.response.header.Access-Control-Allow-Credentials": "'true'",
                            "method.response.header.Access-Control-Allow-Methods": PREFLIGHT_ALLOW_METHODS,
                        },
                        "StatusCode": PREFLIGHT_STATUS,
                    }],
                    "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                    "Type": "MOCK",
                },
                "MethodResponses": [{
                    "ResponseParameters": {
                        "method.response.header.Access-Control-Allow-Headers": true,
                        "method.response.header.Access-Control-Allow-Origin": true,
                        "method.response.header.Access-Control-Allow-Credentials": true,
                        "method.response.header.Access-Control-Allow-Methods": true,
                    },
                    "StatusCode": PREFLIGHT_STATUS,
                }],
            }),
        )
    }
}

/// Path as used in `execute-api` ARNs: path parameters become `*`.
fn permission_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "*"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn api_id() -> LogicalId {
        LogicalId::from_construct_id("api").unwrap()
    }

    fn tree() -> (ResourceTree, NodeId, NodeId) {
        let mut tree = ResourceTree::new(&api_id()).unwrap();
        let v1 = tree.add_resource(tree.root(), "v1").unwrap();
        let entity = tree.add_resource(v1, "entity").unwrap();
        let entity_id = tree.add_resource(entity, "{entityId}").unwrap();
        (tree, entity, entity_id)
    }

    #[test]
    fn test_paths() {
        let (tree, _, _) = tree();
        assert_eq!(
            tree.paths(),
            vec!["/", "/v1", "/v1/entity", "/v1/entity/{entityId}"]
        );
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let (mut tree, _, _) = tree();
        let root = tree.root();
        assert!(tree.add_resource(root, "v1").is_err());
    }

    #[test]
    fn test_permission_path() {
        assert_eq!(permission_path("/v1/entity"), "/v1/entity");
        assert_eq!(permission_path("/v1/entity/{entityId}"), "/v1/entity/*");
        assert_eq!(permission_path("/"), "/");
    }

    #[test]
    fn test_render_resources_and_preflight() {
        let (tree, _, _) = tree();
        let mut stack = Stack::new("api", Environment::new("123456789012", "us-east-1"), "t");
        let rendered = tree.render(&mut stack).unwrap();

        let resource_ids: Vec<&str> = rendered.resources.iter().map(|r| r.as_str()).collect();
        assert_eq!(resource_ids, vec!["ApiV1", "ApiV1Entity", "ApiV1EntityEntityId"]);

        let v1 = stack.template.resource("ApiV1").unwrap();
        assert_eq!(
            v1.property("ParentId"),
            Some(&json!({ "Fn::GetAtt": ["Api", "RootResourceId"] }))
        );
        let entity_id = stack.template.resource("ApiV1EntityEntityId").unwrap();
        assert_eq!(entity_id.property("PathPart"), Some(&json!("{entityId}")));
        assert_eq!(
            entity_id.property("ParentId"),
            Some(&json!({ "Ref": "ApiV1Entity" }))
        );

        // One preflight per node, root included.
        assert_eq!(stack.template.count_of_type("AWS::ApiGateway::Method"), 4);
        let root_options = stack.template.resource("ApiRootOptions").unwrap();
        assert_eq!(root_options.property("AuthorizationType"), Some(&json!("NONE")));
        assert_eq!(
            root_options.property("Integration").unwrap()["IntegrationResponses"][0]
                ["ResponseParameters"]["method.response.header.Access-Control-Allow-Credentials"],
            json!("'true'")
        );
    }

    #[test]
    fn test_render_lambda_method_with_authorizer() {
        let (mut tree, entity, _) = tree();
        let create = LogicalId::from_construct_id("create").unwrap();
        let authorizer = LogicalId::from_construct_id("request-authorizer").unwrap();
        tree.add_method(
            entity,
            HttpMethod::Post,
            Integration::Lambda(create),
            Authorization::Custom(authorizer),
        );

        let mut stack = Stack::new("api", Environment::new("123456789012", "us-east-1"), "t");
        let rendered = tree.render(&mut stack).unwrap();
        assert!(rendered.methods.iter().any(|m| m.as_str() == "ApiV1EntityPost"));

        let method = stack.template.resource("ApiV1EntityPost").unwrap();
        assert_eq!(method.property("HttpMethod"), Some(&json!("POST")));
        assert_eq!(method.property("AuthorizationType"), Some(&json!("CUSTOM")));
        assert_eq!(
            method.property("AuthorizerId"),
            Some(&json!({ "Ref": "RequestAuthorizer" }))
        );
        assert_eq!(
            method.property("Integration").unwrap()["Type"],
            json!("AWS_PROXY")
        );

        let permission = stack.template.resource("ApiV1EntityPostPermission").unwrap();
        let arn_parts = permission.property("SourceArn").unwrap()["Fn::Join"][1]
            .as_array()
            .unwrap();
        assert_eq!(arn_parts.last(), Some(&json!("/*/POST/v1/entity")));
    }

    #[test]
    fn test_routes() {
        let (mut tree, entity, entity_id) = tree();
        let root = tree.root();
        tree.add_method(root, HttpMethod::Get, Integration::Mock, Authorization::None);
        tree.add_method(entity, HttpMethod::Post, Integration::Mock, Authorization::None);
        tree.add_method(entity_id, HttpMethod::Delete, Integration::Mock, Authorization::None);

        assert_eq!(
            tree.routes(),
            vec![
                ("/", HttpMethod::Get),
                ("/v1/entity", HttpMethod::Post),
                ("/v1/entity/{entityId}", HttpMethod::Delete),
            ]
        );
    }
}
