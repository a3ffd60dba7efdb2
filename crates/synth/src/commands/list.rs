use entity_stack_core::tables::{self, format_table_summary, primary_table_config};
use entity_stack_core::CloudAssembly;

use super::{synthesize_from, AssemblyArgs};
use crate::error::Result;

pub fn run(args: &AssemblyArgs) -> Result<Vec<String>> {
    let assembly = synthesize_from(args)?;
    Ok(format_stacks(&assembly))
}

/// Pure function: one line per stack in deployment order, with the table
/// schema under the tables stack.
pub fn format_stacks(assembly: &CloudAssembly) -> Vec<String> {
    let mut lines = Vec::new();
    for stack in &assembly.stacks {
        let mut line = format!("{} ({})", stack.name, stack.environment.uri());
        if !stack.dependencies.is_empty() {
            line.push_str(&format!(" depends on: {}", stack.dependencies.join(", ")));
        }
        lines.push(line);

        if stack.name == tables::STACK_NAME {
            lines.extend(
                format_table_summary(&primary_table_config())
                    .into_iter()
                    .map(|l| format!("  {}", l)),
            );
        }
    }
    lines
}
