//! CloudFormation intrinsic function helpers.

use serde_json::{json, Value};

use super::LogicalId;

pub const AWS_ACCOUNT_ID: &str = "AWS::AccountId";
pub const AWS_REGION: &str = "AWS::Region";
pub const AWS_PARTITION: &str = "AWS::Partition";
pub const AWS_URL_SUFFIX: &str = "AWS::URLSuffix";

/// `{ "Ref": <logical id> }`
pub fn ref_to(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{ "Ref": "AWS::..." }`
pub fn pseudo(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{ "Fn::GetAtt": [<logical id>, <attribute>] }`
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

/// `{ "Fn::Join": [<separator>, [<parts>...]] }`
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

/// `{ "Fn::Sub": <template> }`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// `{ "Fn::ImportValue": <export name> }`
pub fn import_value(export_name: &str) -> Value {
    json!({ "Fn::ImportValue": export_name })
}

/// ARN of an AWS managed policy, partition-aware.
pub fn managed_policy_arn(name: &str) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            pseudo(AWS_PARTITION),
            json!(format!(":iam::aws:policy/{}", name)),
        ],
    )
}

/// API Gateway integration URI invoking a Lambda function.
pub fn lambda_invocation_uri(function: &LogicalId) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            pseudo(AWS_PARTITION),
            json!(":apigateway:"),
            pseudo(AWS_REGION),
            json!(":lambda:path/2015-03-31/functions/"),
            get_att(function, "Arn"),
            json!("/invocations"),
        ],
    )
}

/// `execute-api` ARN of a REST API followed by `suffix` parts (e.g. `/*/GET/v1`).
pub fn execute_api_arn(rest_api: &LogicalId, suffix: Vec<Value>) -> Value {
    let mut parts = vec![
        json!("arn:"),
        pseudo(AWS_PARTITION),
        json!(":execute-api:"),
        pseudo(AWS_REGION),
        json!(":"),
        pseudo(AWS_ACCOUNT_ID),
        json!(":"),
        ref_to(rest_api),
    ];
    parts.extend(suffix);
    join("", parts)
}
