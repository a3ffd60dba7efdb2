//! Container runtime used to build Lambda artifacts.
//!
//! Argument construction is pure; running the container is the only I/O.

use std::path::Path;

use entity_stack_core::AssetEntry;
use tokio::process::Command;

use super::error::{BundleError, Result};

/// Mount point of the source tree inside the build container.
pub const ASSET_INPUT_DIR: &str = "/asset-input";
/// Mount point collected as the built artifact.
pub const ASSET_OUTPUT_DIR: &str = "/asset-output";

/// Container runtime (Docker or Podman).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

/// Returns the CLI command for the container runtime.
pub fn runtime_command(runtime: ContainerRuntime) -> &'static str {
    match runtime {
        ContainerRuntime::Docker => "docker",
        ContainerRuntime::Podman => "podman",
    }
}

/// Directory under the assembly where an asset's artifact lands.
pub fn asset_output_dir(out_dir: &Path, asset: &AssetEntry) -> std::path::PathBuf {
    out_dir.join(format!("asset.{}", asset.id))
}

/// Builds arguments for `docker run` / `podman run`:
/// `run --rm -v <source>:/asset-input -v <output>:/asset-output -w /asset-input <image> <command...>`.
pub fn bundle_run_args(asset: &AssetEntry, source_dir: &Path, output_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:{}", source_dir.display(), ASSET_INPUT_DIR),
        "-v".to_string(),
        format!("{}:{}", output_dir.display(), ASSET_OUTPUT_DIR),
        "-w".to_string(),
        ASSET_INPUT_DIR.to_string(),
        asset.image.clone(),
    ];
    args.extend(asset.command.iter().cloned());
    args
}

/// Detects which container runtime is available.
///
/// If `prefer_podman` is true, checks Podman first, then Docker.
pub async fn detect_runtime(prefer_podman: bool) -> Result<ContainerRuntime> {
    let check_order = if prefer_podman {
        [ContainerRuntime::Podman, ContainerRuntime::Docker]
    } else {
        [ContainerRuntime::Docker, ContainerRuntime::Podman]
    };

    for runtime in check_order {
        let output = Command::new(runtime_command(runtime))
            .arg("--version")
            .output()
            .await;

        if let Ok(output) = output {
            if output.status.success() {
                return Ok(runtime);
            }
        }
    }

    Err(BundleError::ContainerRuntimeNotFound(
        "Neither docker nor podman found in PATH".to_string(),
    ))
}

/// Runs the build container for one asset with inherited stdio.
pub async fn run_bundle(runtime: ContainerRuntime, args: &[String], target: &str) -> Result<()> {
    let status = Command::new(runtime_command(runtime))
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .await?;

    if !status.success() {
        return Err(BundleError::BuildFailed {
            target: target.to_string(),
            status,
        });
    }
    Ok(())
}
