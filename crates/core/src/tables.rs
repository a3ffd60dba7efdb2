//! The `tables` stack: the primary data store and its handle.

use serde_json::{json, Value};

use crate::config::Environment;
use crate::error::Result;
use crate::stack::Stack;
use crate::template::{intrinsic, LogicalId, Resource};

pub const STACK_NAME: &str = "tables";

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub construct_id: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub billing_mode: BillingMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// DynamoDB attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl AttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

impl BillingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PayPerRequest => "PAY_PER_REQUEST",
        }
    }
}

impl KeyAttribute {
    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::String,
        }
    }
}

/// Returns the primary table configuration.
/// Items are keyed by `id` with a `secondaryId` sort key.
pub fn primary_table_config() -> TableConfig {
    TableConfig {
        construct_id: "primary-table".to_string(),
        partition_key: KeyAttribute::string("id"),
        sort_key: Some(KeyAttribute::string("secondaryId")),
        billing_mode: BillingMode::PayPerRequest,
    }
}

/// Reference to a table owned by another stack.
///
/// Consumers read the name and ARN through stack exports; the handle itself has
/// no way to change the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub stack: String,
    pub logical_id: LogicalId,
    name_export: String,
    arn_export: String,
}

impl TableHandle {
    /// Table name as seen from another stack.
    pub fn table_name(&self) -> Value {
        intrinsic::import_value(&self.name_export)
    }

    /// Table ARN as seen from another stack.
    pub fn table_arn(&self) -> Value {
        intrinsic::import_value(&self.arn_export)
    }

    pub fn name_export(&self) -> &str {
        &self.name_export
    }

    pub fn arn_export(&self) -> &str {
        &self.arn_export
    }
}

/// The `tables` stack and the handle it exposes.
#[derive(Debug, Clone)]
pub struct Tables {
    stack: Stack,
    primary_table: TableHandle,
}

impl Tables {
    pub fn new(environment: Environment) -> Result<Self> {
        let mut stack = Stack::new(
            STACK_NAME,
            environment,
            "Primary data store for the entity API",
        );

        let config = primary_table_config();
        let logical_id = LogicalId::from_construct_id(&config.construct_id)?;
        stack.add(&logical_id, table_resource(&config))?;

        let name_export = stack.export(
            &format!("{}Name", logical_id),
            intrinsic::ref_to(&logical_id),
        )?;
        let arn_export = stack.export(
            &format!("{}Arn", logical_id),
            intrinsic::get_att(&logical_id, "Arn"),
        )?;

        Ok(Self {
            stack,
            primary_table: TableHandle {
                stack: STACK_NAME.to_string(),
                logical_id,
                name_export,
                arn_export,
            },
        })
    }

    pub fn primary_table(&self) -> &TableHandle {
        &self.primary_table
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}

fn table_resource(config: &TableConfig) -> Resource {
    let mut key_schema = vec![json!({
        "AttributeName": config.partition_key.name,
        "KeyType": "HASH",
    })];
    let mut attribute_definitions = vec![json!({
        "AttributeName": config.partition_key.name,
        "AttributeType": config.partition_key.attribute_type.as_str(),
    })];

    if let Some(sk) = &config.sort_key {
        key_schema.push(json!({
            "AttributeName": sk.name,
            "KeyType": "RANGE",
        }));
        attribute_definitions.push(json!({
            "AttributeName": sk.name,
            "AttributeType": sk.attribute_type.as_str(),
        }));
    }

    Resource::new(
        "AWS::DynamoDB::Table",
        json!({
            "KeySchema": key_schema,
            "AttributeDefinitions": attribute_definitions,
            "BillingMode": config.billing_mode.as_str(),
        }),
    )
    .retain()
}

/// Pure function: Format a table configuration for display.
pub fn format_table_summary(config: &TableConfig) -> Vec<String> {
    let mut lines = vec![
        format!("Table: {}", config.construct_id),
        format!(
            "  Partition key: {} ({})",
            config.partition_key.name,
            config.partition_key.attribute_type.as_str()
        ),
    ];
    if let Some(sk) = &config.sort_key {
        lines.push(format!(
            "  Sort key: {} ({})",
            sk.name,
            sk.attribute_type.as_str()
        ));
    }
    lines.push(format!("  Billing: {}", config.billing_mode.as_str()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Tables {
        Tables::new(Environment::new("123456789012", "us-east-1")).unwrap()
    }

    #[test]
    fn test_single_table_resource() {
        let tables = tables();
        let template = &tables.stack().template;

        assert_eq!(template.resources.len(), 1);
        assert_eq!(template.count_of_type("AWS::DynamoDB::Table"), 1);
    }

    #[test]
    fn test_table_key_schema() {
        let tables = tables();
        let table = tables.stack().template.resource("PrimaryTable").unwrap();

        assert_eq!(
            table.property("KeySchema"),
            Some(&json!([
                { "AttributeName": "id", "KeyType": "HASH" },
                { "AttributeName": "secondaryId", "KeyType": "RANGE" },
            ]))
        );
        assert_eq!(
            table.property("BillingMode"),
            Some(&json!("PAY_PER_REQUEST"))
        );
        assert_eq!(table.deletion_policy.as_deref(), Some("Retain"));
    }

    #[test]
    fn test_handle_reads_through_exports() {
        let tables = tables();
        let handle = tables.primary_table();

        assert_eq!(handle.stack, "tables");
        assert_eq!(handle.logical_id.as_str(), "PrimaryTable");
        assert_eq!(
            handle.table_name(),
            json!({ "Fn::ImportValue": "tables-PrimaryTableName" })
        );
        assert_eq!(
            handle.table_arn(),
            json!({ "Fn::ImportValue": "tables-PrimaryTableArn" })
        );

        let exports = tables.stack().template.export_names();
        assert!(exports.contains(&handle.name_export()));
        assert!(exports.contains(&handle.arn_export()));
    }

    #[test]
    fn test_stack_bound_to_environment() {
        let tables = tables();
        assert_eq!(tables.stack().environment.account, "123456789012");
        assert!(tables.stack().dependencies.is_empty());
    }

    #[test]
    fn test_format_table_summary() {
        let lines = format_table_summary(&primary_table_config());
        assert_eq!(
            lines,
            vec![
                "Table: primary-table",
                "  Partition key: id (S)",
                "  Sort key: secondaryId (S)",
                "  Billing: PAY_PER_REQUEST",
            ]
        );
    }
}
