//! Lambda function descriptors and their rendering into stack resources.
//!
//! A [`FunctionSpec`] is pure data: build target, runtime settings, environment
//! and grants. [`FunctionSpec::render`] turns it into an execution role, an
//! optional inline policy, the function and its log group.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::assets::{AssetEntry, AssetSource};
use crate::error::Result;
use crate::stack::Stack;
use crate::tables::TableHandle;
use crate::template::{intrinsic, LogicalId, Resource};

pub const HANDLER: &str = "main";
pub const RUNTIME: &str = "provided.al2";
pub const DEFAULT_TIMEOUT_SECS: u32 = 5;
pub const LOG_RETENTION_DAYS: u32 = 7;

pub const BUNDLING_IMAGE: &str = "golang:1.21.3";
pub const ARTIFACT_NAME: &str = "bootstrap";

pub const CORS_ENV_VAR: &str = "CORS_ALLOW_ORIGIN_HEADER";
pub const TABLE_ENV_VAR: &str = "PRIMARY_TABLE_NAME";
pub const TOPIC_ENV_VAR: &str = "PRIMARY_SNS_TOPIC_ARN";

const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
const POLICY_VERSION: &str = "2012-10-17";

/// Build step producing the function artifact inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundling {
    pub image: String,
    pub command: Vec<String>,
}

impl Bundling {
    /// Go cross-compilation of `./cmd/<target>` into `/asset-output/bootstrap`.
    pub fn go(target: &str) -> Self {
        Self {
            image: BUNDLING_IMAGE.to_string(),
            command: vec![
                "bash".to_string(),
                "-c".to_string(),
                format!(
                    "GOCACHE=/tmp go mod tidy && GOCACHE=/tmp GOOS=linux GOARCH=amd64 go build -o /asset-output/{} ./cmd/{}",
                    ARTIFACT_NAME, target
                ),
            ],
        }
    }
}

/// An IAM permission attached to a function's role.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl Grant {
    /// Full read/write access to a table.
    pub fn table_full_access(table: &TableHandle) -> Self {
        Self {
            actions: vec!["dynamodb:*".to_string()],
            resources: vec![table.table_arn()],
        }
    }

    /// `sns:Publish` on a topic.
    pub fn topic_publish(topic_arn: Value) -> Self {
        Self {
            actions: vec!["sns:Publish".to_string()],
            resources: vec![topic_arn],
        }
    }

    /// `sqs:SendMessage` on a queue.
    pub fn queue_send(queue_arn: Value) -> Self {
        Self {
            actions: vec!["sqs:SendMessage".to_string()],
            resources: vec![queue_arn],
        }
    }

    fn statement(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => json!(many),
        };
        json!({
            "Action": action,
            "Effect": "Allow",
            "Resource": resource,
        })
    }
}

/// Declarative description of one Lambda function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub construct_id: String,
    pub target: String,
    pub handler: String,
    pub runtime: String,
    pub timeout_secs: u32,
    pub log_retention_days: u32,
    pub environment: BTreeMap<String, Value>,
    pub bundling: Bundling,
    pub grants: Vec<Grant>,
    pub dead_letter_queue_arn: Option<Value>,
}

/// Logical ids of a rendered function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    pub function: LogicalId,
    pub role: LogicalId,
    pub asset_id: String,
}

impl FunctionSpec {
    /// Shared settings of every function: `main` handler, `provided.al2`,
    /// 5 second timeout, one week of logs and the CORS origin variable.
    pub fn base(construct_id: &str, target: &str, cors_origin: &str) -> Self {
        let mut environment = BTreeMap::new();
        environment.insert(CORS_ENV_VAR.to_string(), json!(cors_origin));

        Self {
            construct_id: construct_id.to_string(),
            target: target.to_string(),
            handler: HANDLER.to_string(),
            runtime: RUNTIME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_retention_days: LOG_RETENTION_DAYS,
            environment,
            bundling: Bundling::go(target),
            grants: Vec::new(),
            dead_letter_queue_arn: None,
        }
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn with_environment(mut self, key: &str, value: Value) -> Self {
        self.environment.insert(key.to_string(), value);
        self
    }

    pub fn with_dead_letter_queue(mut self, queue_arn: Value) -> Self {
        self.grants.push(Grant::queue_send(queue_arn.clone()));
        self.dead_letter_queue_arn = Some(queue_arn);
        self
    }

    pub fn grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Grants full table access and injects the table name variable.
    pub fn connect_table(self, table: &TableHandle) -> Self {
        self.grant(Grant::table_full_access(table))
            .with_environment(TABLE_ENV_VAR, table.table_name())
    }

    /// Asset entry describing how this function's code is built.
    pub fn asset_entry(&self, source: &AssetSource) -> AssetEntry {
        let id = source.asset_id(&self.target);
        AssetEntry {
            object_key: format!("{}.zip", id),
            id,
            target: self.target.clone(),
            source_path: source.source_path.clone(),
            image: self.bundling.image.clone(),
            command: self.bundling.command.clone(),
            artifact: ARTIFACT_NAME.to_string(),
        }
    }

    /// Adds the role, policy, function and log group to `stack`.
    pub fn render(&self, stack: &mut Stack, source: &AssetSource) -> Result<FunctionRef> {
        let function_id = LogicalId::from_construct_id(&self.construct_id)?;
        let role_id = function_id.child("service-role")?;
        let asset = self.asset_entry(source);

        stack.add(
            &role_id,
            Resource::new(
                "AWS::IAM::Role",
                json!({
                    "AssumeRolePolicyDocument": {
                        "Version": POLICY_VERSION,
                        "Statement": [{
                            "Action": "sts:AssumeRole",
                            "Effect": "Allow",
                            "Principal": { "Service": "lambda.amazonaws.com" },
                        }],
                    },
                    "ManagedPolicyArns": [intrinsic::managed_policy_arn(BASIC_EXECUTION_POLICY)],
                }),
            ),
        )?;

        let mut properties = json!({
            "Code": {
                "S3Bucket": intrinsic::sub("cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}"),
                "S3Key": asset.object_key,
            },
            "Handler": self.handler,
            "Runtime": self.runtime,
            "Timeout": self.timeout_secs,
            "Role": intrinsic::get_att(&role_id, "Arn"),
            "Environment": { "Variables": self.environment },
        });
        if let Some(dlq) = &self.dead_letter_queue_arn {
            properties["DeadLetterConfig"] = json!({ "TargetArn": dlq });
        }

        let mut function = Resource::new("AWS::Lambda::Function", properties).depends_on(&role_id);

        if !self.grants.is_empty() {
            let policy_id = role_id.child("default-policy")?;
            let statements: Vec<Value> = self.grants.iter().map(Grant::statement).collect();
            stack.add(
                &policy_id,
                Resource::new(
                    "AWS::IAM::Policy",
                    json!({
                        "PolicyName": policy_id.as_str(),
                        "PolicyDocument": {
                            "Version": POLICY_VERSION,
                            "Statement": statements,
                        },
                        "Roles": [intrinsic::ref_to(&role_id)],
                    }),
                ),
            )?;
            function = function.depends_on(&policy_id);
        }

        stack.add(&function_id, function)?;

        stack.add(
            &function_id.child("log-group")?,
            Resource::new(
                "AWS::Logs::LogGroup",
                json!({
                    "LogGroupName": intrinsic::join(
                        "",
                        vec![json!("/aws/lambda/"), intrinsic::ref_to(&function_id)],
                    ),
                    "RetentionInDays": self.log_retention_days,
                }),
            ),
        )?;

        Ok(FunctionRef {
            function: function_id,
            role: role_id,
            asset_id: asset.id,
        })
    }
}
