use std::path::PathBuf;

use super::{synthesize_from, AssemblyArgs};
use crate::error::Result;
use crate::output::write_assembly;

/// Synthesizes and writes the assembly. Returns the written paths.
///
/// A config or synthesis failure returns before the output directory is touched.
pub fn run(args: &AssemblyArgs) -> Result<Vec<PathBuf>> {
    let assembly = synthesize_from(args)?;
    let written = write_assembly(&args.out, &assembly)?;

    for stack in &assembly.stacks {
        tracing::info!(
            stack = %stack.name,
            template = %args.out.join(stack.template_file()).display(),
            "Wrote stack"
        );
    }
    tracing::info!(
        assets = assembly.assets.assets.len(),
        out = %args.out.display(),
        "Wrote cloud assembly"
    );

    Ok(written)
}
