pub mod diff;
pub mod list;
pub mod synth;

use std::path::PathBuf;

use entity_stack_core::{synthesize, AssetSource, CloudAssembly};

use crate::config::{load_config, DEFAULT_CONFIG_PATH};
use crate::error::Result;
use crate::fingerprint::{fingerprint_dir, DEFAULT_SOURCE_DIR};
use crate::output::DEFAULT_OUT_DIR;

/// Inputs shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub struct AssemblyArgs {
    /// Deployment config document
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "ENTITY_STACK_CONFIG")]
    pub config: PathBuf,

    /// Cloud assembly output directory
    #[arg(long, default_value = DEFAULT_OUT_DIR, env = "ENTITY_STACK_OUT")]
    pub out: PathBuf,

    /// Lambda source tree
    #[arg(long, default_value = DEFAULT_SOURCE_DIR)]
    pub source: PathBuf,
}

/// Loads the config, fingerprints the source tree and synthesizes in memory.
pub fn synthesize_from(args: &AssemblyArgs) -> Result<CloudAssembly> {
    let config = load_config(&args.config)?;
    let fingerprint = fingerprint_dir(&args.source)?;
    let source = AssetSource::new(args.source.display().to_string(), fingerprint)?;

    let assembly = synthesize(&config, &source)?;
    for stack in &assembly.stacks {
        tracing::debug!(
            stack = %stack.name,
            resources = stack.template.resources.len(),
            "Synthesized stack"
        );
    }
    Ok(assembly)
}
