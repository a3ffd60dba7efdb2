//! REST API level constructs: the API itself, logging, stage, authorizer,
//! API key, usage plan, gateway responses and request validators.

use std::collections::BTreeMap;

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::{Result, SynthError};
use crate::stack::Stack;
use crate::template::{intrinsic, LogicalId, Resource};

pub const STAGE_NAME: &str = "prod";
pub const AUTHORIZER_TTL_SECS: u32 = 3600;
pub const AUTHORIZER_IDENTITY_SOURCE: &str = "method.request.header.Authorization";
pub const THROTTLE_BURST_LIMIT: u32 = 5000;
pub const THROTTLE_RATE_LIMIT: u32 = 10000;
pub const ACCESS_LOG_RETENTION_DAYS: u32 = 7;

const ACCESS_LOG_FORMAT: &str = concat!(
    r#"{"requestId":"$context.requestId","ip":"$context.identity.sourceIp","#,
    r#""user":"$context.identity.user","requestTime":"$context.requestTime","#,
    r#""httpMethod":"$context.httpMethod","resourcePath":"$context.resourcePath","#,
    r#""status":"$context.status","protocol":"$context.protocol","#,
    r#""responseLength":"$context.responseLength"}"#
);

/// Gateway error responses that must carry CORS headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayResponseType {
    Default4xx,
    Default5xx,
}

impl GatewayResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default4xx => "DEFAULT_4XX",
            Self::Default5xx => "DEFAULT_5XX",
        }
    }

    fn construct_id(self) -> &'static str {
        match self {
            Self::Default4xx => "default-4xx-gateway-response",
            Self::Default5xx => "default-5xx-gateway-response",
        }
    }
}

/// Logical ids of the REST API level resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestApiIds {
    pub rest_api: LogicalId,
    pub access_logs: LogicalId,
    pub account: LogicalId,
}

/// Adds the regional REST API with header API key source, its CloudWatch role
/// and the access log group.
pub fn add_rest_api(stack: &mut Stack, construct_id: &str) -> Result<RestApiIds> {
    let rest_api = LogicalId::from_construct_id(construct_id)?;
    stack.add(
        &rest_api,
        Resource::new(
            "AWS::ApiGateway::RestApi",
            json!({
                "Name": construct_id,
                "EndpointConfiguration": { "Types": ["REGIONAL"] },
                "ApiKeySourceType": "HEADER",
            }),
        ),
    )?;

    let role = rest_api.child("cloud-watch-role")?;
    stack.add(
        &role,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "apigateway.amazonaws.com" },
                    }],
                },
                "ManagedPolicyArns": [intrinsic::managed_policy_arn(
                    "service-role/AmazonAPIGatewayPushToCloudWatchLogs",
                )],
            }),
        )
        .retain(),
    )?;

    let account = rest_api.child("account")?;
    stack.add(
        &account,
        Resource::new(
            "AWS::ApiGateway::Account",
            json!({ "CloudWatchRoleArn": intrinsic::get_att(&role, "Arn") }),
        )
        .depends_on(&rest_api)
        .retain(),
    )?;

    let access_logs = LogicalId::from_construct_id("api-access-logs")?;
    stack.add(
        &access_logs,
        Resource::new(
            "AWS::Logs::LogGroup",
            json!({ "RetentionInDays": ACCESS_LOG_RETENTION_DAYS }),
        )
        .retain(),
    )?;

    Ok(RestApiIds {
        rest_api,
        access_logs,
        account,
    })
}

/// Hex characters of the content hash appended to the deployment id.
const DEPLOYMENT_HASH_LEN: usize = 8;

/// Pure function: hash of every resource the deployment snapshots.
///
/// Any change to one of them yields a new deployment id, which makes
/// CloudFormation create a fresh deployment and repoint the stage.
pub fn deployment_hash(stack: &Stack, snapshot: &[LogicalId]) -> Result<String> {
    let resources: BTreeMap<&str, Option<&Resource>> = snapshot
        .iter()
        .map(|id| (id.as_str(), stack.template.resource(id.as_str())))
        .collect();
    let serialized =
        serde_json::to_vec(&resources).map_err(|e| SynthError::Serialization(e.to_string()))?;

    let digest = format!("{:X}", Sha256::digest(&serialized));
    Ok(digest[..DEPLOYMENT_HASH_LEN].to_string())
}

/// Adds the deployment and the `prod` stage with error-level method logging
/// and access logs.
///
/// `snapshot` lists everything the deployment captures (methods, resources,
/// authorizer, gateway responses, validators). The deployment depends on all
/// of them and its logical id carries their content hash.
pub fn add_deployment(
    stack: &mut Stack,
    ids: &RestApiIds,
    snapshot: &[LogicalId],
) -> Result<LogicalId> {
    let hash = deployment_hash(stack, snapshot)?;
    let deployment = ids.rest_api.child(&format!("deployment-{}", hash))?;
    let mut resource = Resource::new(
        "AWS::ApiGateway::Deployment",
        json!({
            "RestApiId": intrinsic::ref_to(&ids.rest_api),
            "Description": "Automatically created by entity-stack",
        }),
    );
    for id in snapshot {
        resource = resource.depends_on(id);
    }
    stack.add(&deployment, resource)?;

    let stage = ids
        .rest_api
        .child(&format!("deployment-stage-{}", STAGE_NAME))?;
    stack.add(
        &stage,
        Resource::new(
            "AWS::ApiGateway::Stage",
            json!({
                "RestApiId": intrinsic::ref_to(&ids.rest_api),
                "DeploymentId": intrinsic::ref_to(&deployment),
                "StageName": STAGE_NAME,
                "AccessLogSetting": {
                    "DestinationArn": intrinsic::get_att(&ids.access_logs, "Arn"),
                    "Format": ACCESS_LOG_FORMAT,
                },
                "MethodSettings": [{
                    "DataTraceEnabled": false,
                    "HttpMethod": "*",
                    "LoggingLevel": "ERROR",
                    "ResourcePath": "/*",
                }],
            }),
        )
        .depends_on(&ids.account),
    )?;

    Ok(stage)
}

/// Adds the request authorizer and the permission letting API Gateway call it.
pub fn add_request_authorizer(
    stack: &mut Stack,
    construct_id: &str,
    rest_api: &LogicalId,
    function: &LogicalId,
) -> Result<LogicalId> {
    let authorizer = LogicalId::from_construct_id(construct_id)?;
    let name = format!("{}{}", stack.name, authorizer);
    stack.add(
        &authorizer,
        Resource::new(
            "AWS::ApiGateway::Authorizer",
            json!({
                "Name": name,
                "RestApiId": intrinsic::ref_to(rest_api),
                "Type": "REQUEST",
                "AuthorizerUri": intrinsic::lambda_invocation_uri(function),
                "AuthorizerResultTtlInSeconds": AUTHORIZER_TTL_SECS,
                "IdentitySource": AUTHORIZER_IDENTITY_SOURCE,
            }),
        ),
    )?;

    stack.add(
        &authorizer.child("permission")?,
        Resource::new(
            "AWS::Lambda::Permission",
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": intrinsic::get_att(function, "Arn"),
                "Principal": "apigateway.amazonaws.com",
                "SourceArn": intrinsic::execute_api_arn(
                    rest_api,
                    vec![json!("/authorizers/"), intrinsic::ref_to(&authorizer)],
                ),
            }),
        ),
    )?;

    Ok(authorizer)
}

/// Adds an API key bound to the stage and a throttled usage plan using it.
pub fn add_usage_plan(
    stack: &mut Stack,
    rest_api: &LogicalId,
    stage: &LogicalId,
) -> Result<LogicalId> {
    let api_key = rest_api.child("api-key")?;
    stack.add(
        &api_key,
        Resource::new(
            "AWS::ApiGateway::ApiKey",
            json!({
                "Enabled": true,
                "StageKeys": [{
                    "RestApiId": intrinsic::ref_to(rest_api),
                    "StageName": intrinsic::ref_to(stage),
                }],
            }),
        ),
    )?;

    let usage_plan = LogicalId::from_construct_id("usage-plan")?;
    stack.add(
        &usage_plan,
        Resource::new(
            "AWS::ApiGateway::UsagePlan",
            json!({
                "ApiStages": [{
                    "ApiId": intrinsic::ref_to(rest_api),
                    "Stage": intrinsic::ref_to(stage),
                }],
                "Throttle": {
                    "BurstLimit": THROTTLE_BURST_LIMIT,
                    "RateLimit": THROTTLE_RATE_LIMIT,
                },
            }),
        ),
    )?;

    stack.add(
        &usage_plan.child("api-key")?,
        Resource::new(
            "AWS::ApiGateway::UsagePlanKey",
            json!({
                "KeyId": intrinsic::ref_to(&api_key),
                "KeyType": "API_KEY",
                "UsagePlanId": intrinsic::ref_to(&usage_plan),
            }),
        ),
    )?;

    Ok(usage_plan)
}

/// Adds a gateway response carrying the configured origin and credentials
/// headers. Requests rejected by the authorizer never reach a Lambda, so
/// these are the only CORS headers they get.
pub fn add_cors_gateway_response(
    stack: &mut Stack,
    rest_api: &LogicalId,
    response_type: GatewayResponseType,
    cors_origin: &str,
) -> Result<LogicalId> {
    let id = LogicalId::from_construct_id(response_type.construct_id())?;
    stack.add(
        &id,
        Resource::new(
            "AWS::ApiGateway::GatewayResponse",
            json!({
                "ResponseType": response_type.as_str(),
                "RestApiId": intrinsic::ref_to(rest_api),
                "ResponseParameters": {
                    "gatewayresponse.header.Access-Control-Allow-Origin": format!("'{}'", cors_origin),
                    "gatewayresponse.header.Access-Control-Allow-Credentials": "'true'",
                },
            }),
        ),
    )?;
    Ok(id)
}

/// Adds the `validateBody` and `validateParams` request validators.
pub fn add_request_validators(stack: &mut Stack, rest_api: &LogicalId) -> Result<Vec<LogicalId>> {
    let body = rest_api.child("validateBody")?;
    stack.add(
        &body,
        Resource::new(
            "AWS::ApiGateway::RequestValidator",
            json!({
                "Name": "validateBody",
                "RestApiId": intrinsic::ref_to(rest_api),
                "ValidateRequestBody": true,
            }),
        ),
    )?;

    let params = rest_api.child("validateParams")?;
    stack.add(
        &params,
        Resource::new(
            "AWS::ApiGateway::RequestValidator",
            json!({
                "Name": "validateParams",
                "RestApiId": intrinsic::ref_to(rest_api),
                "ValidateRequestParameters": true,
            }),
        ),
    )?;

    Ok(vec![body, params])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn stack() -> Stack {
        Stack::new("api", Environment::new("123456789012", "us-east-1"), "t")
    }

    #[test]
    fn test_rest_api_settings() {
        let mut stack = stack();
        let ids = add_rest_api(&mut stack, "api").unwrap();

        let api = stack.template.resource(ids.rest_api.as_str()).unwrap();
        assert_eq!(api.property("Name"), Some(&json!("api")));
        assert_eq!(
            api.property("EndpointConfiguration"),
            Some(&json!({ "Types": ["REGIONAL"] }))
        );
        assert_eq!(api.property("ApiKeySourceType"), Some(&json!("HEADER")));

        let logs = stack.template.resource("ApiAccessLogs").unwrap();
        assert_eq!(logs.property("RetentionInDays"), Some(&json!(7)));
    }

    #[test]
    fn test_stage_logging() {
        let mut stack = stack();
        let ids = add_rest_api(&mut stack, "api").unwrap();
        let method = LogicalId::from_construct_id("api-root-get").unwrap();
        let stage = add_deployment(&mut stack, &ids, &[method]).unwrap();

        assert_eq!(stage.as_str(), "ApiDeploymentStageProd");
        let resource = stack.template.resource(stage.as_str()).unwrap();
        assert_eq!(resource.property("StageName"), Some(&json!("prod")));
        assert_eq!(
            resource.property("MethodSettings").unwrap()[0]["LoggingLevel"],
            json!("ERROR")
        );
        assert_eq!(
            resource.property("AccessLogSetting").unwrap()["DestinationArn"],
            json!({ "Fn::GetAtt": ["ApiAccessLogs", "Arn"] })
        );

        let deployment_id = resource.property("DeploymentId").unwrap()["Ref"]
            .as_str()
            .unwrap();
        assert!(deployment_id.starts_with("ApiDeployment"));
        assert_eq!(deployment_id.len(), "ApiDeployment".len() + 8);
        let deployment = stack.template.resource(deployment_id).unwrap();
        assert!(deployment.depends_on.contains("ApiRootGet"));
    }

    #[test]
    fn test_deployment_hash_follows_snapshot_content() {
        let mut stack = stack();
        let api = LogicalId::from_construct_id("api").unwrap();
        let response = add_cors_gateway_response(
            &mut stack,
            &api,
            GatewayResponseType::Default4xx,
            "https://a.example.com",
        )
        .unwrap();
        let snapshot = [response.clone()];

        let first = deployment_hash(&stack, &snapshot).unwrap();
        assert_eq!(first, deployment_hash(&stack, &snapshot).unwrap());
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let mut other = self::stack();
        add_cors_gateway_response(
            &mut other,
            &api,
            GatewayResponseType::Default4xx,
            "https://b.example.com",
        )
        .unwrap();
        assert_ne!(first, deployment_hash(&other, &snapshot).unwrap());
    }

    #[test]
    fn test_authorizer_settings() {
        let mut stack = stack();
        let api = LogicalId::from_construct_id("api").unwrap();
        let function = LogicalId::from_construct_id("request-authorizer-lambda").unwrap();
        let authorizer =
            add_request_authorizer(&mut stack, "request-authorizer", &api, &function).unwrap();

        let resource = stack.template.resource(authorizer.as_str()).unwrap();
        assert_eq!(resource.property("Type"), Some(&json!("REQUEST")));
        assert_eq!(
            resource.property("AuthorizerResultTtlInSeconds"),
            Some(&json!(3600))
        );
        assert_eq!(
            resource.property("IdentitySource"),
            Some(&json!("method.request.header.Authorization"))
        );
        assert!(stack
            .template
            .resource("RequestAuthorizerPermission")
            .is_some());
    }

    #[test]
    fn test_usage_plan_throttle() {
        let mut stack = stack();
        let api = LogicalId::from_construct_id("api").unwrap();
        let stage = LogicalId::from_construct_id("api-deployment-stage-prod").unwrap();
        let plan = add_usage_plan(&mut stack, &api, &stage).unwrap();

        let resource = stack.template.resource(plan.as_str()).unwrap();
        assert_eq!(
            resource.property("Throttle"),
            Some(&json!({ "BurstLimit": 5000, "RateLimit": 10000 }))
        );
        let key = stack.template.resource("UsagePlanApiKey").unwrap();
        assert_eq!(key.property("KeyId"), Some(&json!({ "Ref": "ApiApiKey" })));
    }

    #[test]
    fn test_cors_gateway_response() {
        let mut stack = stack();
        let api = LogicalId::from_construct_id("api").unwrap();
        let id = add_cors_gateway_response(
            &mut stack,
            &api,
            GatewayResponseType::Default5xx,
            "https://app.example.com",
        )
        .unwrap();

        assert_eq!(id.as_str(), "Default5xxGatewayResponse");
        let resource = stack.template.resource(id.as_str()).unwrap();
        assert_eq!(resource.property("ResponseType"), Some(&json!("DEFAULT_5XX")));
        assert_eq!(
            resource.property("ResponseParameters"),
            Some(&json!({
                "gatewayresponse.header.Access-Control-Allow-Origin": "'https://app.example.com'",
                "gatewayresponse.header.Access-Control-Allow-Credentials": "'true'",
            }))
        );
    }

    #[test]
    fn test_request_validators() {
        let mut stack = stack();
        let api = LogicalId::from_construct_id("api").unwrap();
        let ids = add_request_validators(&mut stack, &api).unwrap();

        let names: Vec<&str> = ids.iter().map(LogicalId::as_str).collect();
        assert_eq!(names, vec!["ApiValidateBody", "ApiValidateParams"]);
        assert_eq!(
            stack.template.count_of_type("AWS::ApiGateway::RequestValidator"),
            2
        );
    }
}
