use entity_stack_core::{calculate_delete_plan, calculate_plan, StackPlan};

use super::{synthesize_from, AssemblyArgs};
use crate::error::Result;
use crate::output::read_templates;

/// Plans every synthesized stack against the assembly already on disk,
/// followed by stacks that are no longer synthesized.
pub fn run(args: &AssemblyArgs) -> Result<Vec<StackPlan>> {
    let assembly = synthesize_from(args)?;
    let mut previous = read_templates(&args.out)?;

    let mut plans: Vec<StackPlan> = assembly
        .stacks
        .iter()
        .map(|stack| {
            let existing = previous.remove(&stack.name);
            calculate_plan(&stack.name, existing.as_ref(), &stack.template)
        })
        .collect();
    plans.extend(previous.keys().map(|name| calculate_delete_plan(name)));

    let changed = plans.iter().filter(|p| p.has_changes()).count();
    tracing::info!(stacks = plans.len(), changed, "Calculated plan");

    Ok(plans)
}
