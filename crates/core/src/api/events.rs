//! Asynchronous event handlers fed by the primary SNS topic.
//!
//! Only rendered when the config enables `eventHandlers`.

use serde_json::{json, Value};

use crate::assets::AssetSource;
use crate::error::Result;
use crate::lambda::{FunctionRef, FunctionSpec};
use crate::stack::Stack;
use crate::tables::TableHandle;
use crate::template::{intrinsic, LogicalId, Resource};

/// Background handlers get a longer timeout than the synchronous paths.
pub const EVENT_HANDLER_TIMEOUT_SECS: u32 = 20;

/// One asynchronous handler subscribed to the topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHandlerSpec {
    /// Build target under `cmd/`.
    pub target: String,
    /// Construct id prefix.
    pub kebab_name: String,
    /// Operations accepted by the subscription filter policy.
    pub operations: Vec<String>,
    pub uses_table: bool,
}

/// Adds the primary topic and returns its logical id.
pub fn add_topic(stack: &mut Stack) -> Result<LogicalId> {
    let topic = LogicalId::from_construct_id("primary-topic")?;
    stack.add(&topic, Resource::new("AWS::SNS::Topic", Value::Null))?;
    Ok(topic)
}

/// Adds the dead-letter queue, function, subscription and invoke permission
/// for one handler.
pub fn add_event_handler(
    stack: &mut Stack,
    handler: &EventHandlerSpec,
    topic: &LogicalId,
    table: &TableHandle,
    cors_origin: &str,
    source: &AssetSource,
) -> Result<FunctionRef> {
    let dlq = LogicalId::from_construct_id(&format!("{}-dlq", handler.kebab_name))?;
    stack.add(&dlq, Resource::new("AWS::SQS::Queue", Value::Null))?;

    let mut spec = FunctionSpec::base(
        &format!("{}-lambda", handler.kebab_name),
        &handler.target,
        cors_origin,
    )
    .with_timeout(EVENT_HANDLER_TIMEOUT_SECS)
    .with_dead_letter_queue(intrinsic::get_att(&dlq, "Arn"));
    if handler.uses_table {
        spec = spec.connect_table(table);
    }
    let function = spec.render(stack, source)?;

    let subscription = function.function.child("subscription")?;
    stack.add(
        &subscription,
        Resource::new(
            "AWS::SNS::Subscription",
            json!({
                "Protocol": "lambda",
                "TopicArn": intrinsic::ref_to(topic),
                "Endpoint": intrinsic::get_att(&function.function, "Arn"),
                "FilterPolicy": { "operation": handler.operations },
            }),
        ),
    )?;

    stack.add(
        &subscription.child("permission")?,
        Resource::new(
            "AWS::Lambda::Permission",
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": intrinsic::get_att(&function.function, "Arn"),
                "Principal": "sns.amazonaws.com",
                "SourceArn": intrinsic::ref_to(topic),
            }),
        ),
    )?;

    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::tables::Tables;

    #[test]
    fn test_event_handler_resources() {
        let env = Environment::new("123456789012", "us-east-1");
        let tables = Tables::new(env.clone()).unwrap();
        let source = AssetSource::new("src", "0123456789abcdef").unwrap();
        let mut stack = Stack::new("api", env, "t");

        let topic = add_topic(&mut stack).unwrap();
        let handler = EventHandlerSpec {
            target: "eventAction".to_string(),
            kebab_name: "event-action".to_string(),
            operations: vec!["eventAction".to_string()],
            uses_table: true,
        };
        let function = add_event_handler(
            &mut stack,
            &handler,
            &topic,
            tables.primary_table(),
            "*",
            &source,
        )
        .unwrap();

        assert_eq!(function.function.as_str(), "EventActionLambda");
        assert!(stack.template.resource("EventActionDlq").is_some());

        let lambda = stack.template.resource("EventActionLambda").unwrap();
        assert_eq!(lambda.property("Timeout"), Some(&json!(20)));
        assert_eq!(
            lambda.property("DeadLetterConfig"),
            Some(&json!({ "TargetArn": { "Fn::GetAtt": ["EventActionDlq", "Arn"] } }))
        );

        let subscription = stack
            .template
            .resource("EventActionLambdaSubscription")
            .unwrap();
        assert_eq!(
            subscription.property("FilterPolicy"),
            Some(&json!({ "operation": ["eventAction"] }))
        );
        assert_eq!(
            stack
                .template
                .resource("EventActionLambdaSubscriptionPermission")
                .unwrap()
                .property("Principal"),
            Some(&json!("sns.amazonaws.com"))
        );
    }
}
