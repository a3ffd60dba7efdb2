//! Stacks: named, independently deployable units of declared resources.

use serde_json::Value;

use crate::config::Environment;
use crate::error::{Result, SynthError};
use crate::template::{LogicalId, Output, Resource, Template};

/// A named stack bound to an environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub name: String,
    pub environment: Environment,
    pub template: Template,
    /// Names of stacks that must be deployed before this one.
    pub dependencies: Vec<String>,
}

impl Stack {
    pub fn new(name: &str, environment: Environment, description: &str) -> Self {
        Self {
            name: name.to_string(),
            environment,
            template: Template::new(description),
            dependencies: Vec::new(),
        }
    }

    /// Adds a resource under a new logical id.
    pub fn add(&mut self, logical_id: &LogicalId, resource: Resource) -> Result<()> {
        if self.template.resources.contains_key(logical_id.as_str()) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }
        self.template
            .resources
            .insert(logical_id.to_string(), resource);
        Ok(())
    }

    /// Exports a value as `<stack>-<name>` and returns the export name.
    pub fn export(&mut self, name: &str, value: Value) -> Result<String> {
        let export_name = format!("{}-{}", self.name, name);
        if self.template.export_names().contains(&export_name.as_str()) {
            return Err(SynthError::DuplicateExport(export_name));
        }
        self.template
            .outputs
            .insert(name.to_string(), Output::exported(value, export_name.clone()));
        Ok(export_name)
    }

    pub fn add_dependency(&mut self, stack_name: &str) {
        if !self.dependencies.iter().any(|d| d == stack_name) {
            self.dependencies.push(stack_name.to_string());
        }
    }

    /// File name of the rendered template inside the assembly directory.
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }
}
