//! Pure functions for comparing a previously written assembly with a freshly
//! synthesized one.

use crate::template::Template;

/// A resource and its CloudFormation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub logical_id: String,
    pub resource_type: String,
}

/// Planned changes for one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackPlan {
    /// Stack was never written, every resource is new.
    CreateStack {
        stack: String,
        resources: Vec<ResourceChange>,
    },
    /// Stack exists and some resources differ.
    UpdateStack {
        stack: String,
        added: Vec<ResourceChange>,
        removed: Vec<ResourceChange>,
        changed: Vec<ResourceChange>,
    },
    /// Stack exists but is no longer synthesized.
    DeleteStack { stack: String },
    NoChanges { stack: String },
}

impl StackPlan {
    pub fn has_changes(&self) -> bool {
        !matches!(self, Self::NoChanges { .. })
    }
}

fn change(logical_id: &str, resource_type: &str) -> ResourceChange {
    ResourceChange {
        logical_id: logical_id.to_string(),
        resource_type: resource_type.to_string(),
    }
}

/// Pure function: calculate what changes are needed to reach `desired`.
pub fn calculate_plan(stack: &str, previous: Option<&Template>, desired: &Template) -> StackPlan {
    let Some(previous) = previous else {
        return StackPlan::CreateStack {
            stack: stack.to_string(),
            resources: desired
                .resources
                .iter()
                .map(|(id, r)| change(id, &r.resource_type))
                .collect(),
        };
    };

    let added: Vec<_> = desired
        .resources
        .iter()
        .filter(|(id, _)| !previous.resources.contains_key(*id))
        .map(|(id, r)| change(id, &r.resource_type))
        .collect();

    let removed: Vec<_> = previous
        .resources
        .iter()
        .filter(|(id, _)| !desired.resources.contains_key(*id))
        .map(|(id, r)| change(id, &r.resource_type))
        .collect();

    let changed: Vec<_> = desired
        .resources
        .iter()
        .filter(|(id, r)| previous.resources.get(*id).is_some_and(|p| p != *r))
        .map(|(id, r)| change(id, &r.resource_type))
        .collect();

    // Outputs and description count as changes without a resource to name.
    let metadata_changed =
        previous.outputs != desired.outputs || previous.description != desired.description;

    if added.is_empty() && removed.is_empty() && changed.is_empty() && !metadata_changed {
        StackPlan::NoChanges {
            stack: stack.to_string(),
        }
    } else {
        StackPlan::UpdateStack {
            stack: stack.to_string(),
            added,
            removed,
            changed,
        }
    }
}

/// Pure function: plan for a stack that exists on disk but is no longer synthesized.
pub fn calculate_delete_plan(stack: &str) -> StackPlan {
    StackPlan::DeleteStack {
        stack: stack.to_string(),
    }
}

/// Pure function: format a plan for display.
pub fn format_plan(plan: &StackPlan) -> Vec<String> {
    match plan {
        StackPlan::CreateStack { stack, resources } => {
            let mut lines = vec![format!("+ Create stack: {}", stack)];
            for r in resources {
                lines.push(format!("  + {} ({})", r.logical_id, r.resource_type));
            }
            lines
        }
        StackPlan::UpdateStack {
            stack,
            added,
            removed,
            changed,
        } => {
            let mut lines = vec![format!("~ Update stack: {}", stack)];
            for r in added {
                lines.push(format!("  + {} ({})", r.logical_id, r.resource_type));
            }
            for r in removed {
                lines.push(format!("  - {} ({})", r.logical_id, r.resource_type));
            }
            for r in changed {
                lines.push(format!("  ~ {} ({})", r.logical_id, r.resource_type));
            }
            lines
        }
        StackPlan::DeleteStack { stack } => {
            vec![format!("- Delete stack: {}", stack)]
        }
        StackPlan::NoChanges { stack } => {
            vec![format!("= Stack '{}' is up to date", stack)]
        }
    }
}
