//! Builds the Lambda artifacts listed in `assets.json`.

pub mod containers;
pub mod error;

use std::path::{Path, PathBuf};

use entity_stack_core::assembly::ASSETS_FILE;
use entity_stack_core::{AssetEntry, AssetManifest};

use crate::prelude::*;
use containers::{asset_output_dir, bundle_run_args, detect_runtime, run_bundle, runtime_command};
use error::{BundleError, Result};

/// Build Lambda artifacts in a container
#[derive(Debug, clap::Parser)]
#[command(long_about = "Build the Lambda artifacts listed in the cloud assembly.

Reads assets.json from the assembly directory and runs each asset's build
command in its image, mounting the source tree at /asset-input and
<out>/asset.<id> at /asset-output.

Examples:
  cargo xtask bundle                     # Build every asset in cdk.out
  cargo xtask bundle --only create       # Build a single target
  cargo xtask bundle --podman            # Prefer podman over docker")]
pub struct BundleCommand {
    /// Cloud assembly directory
    #[arg(long, default_value = "cdk.out", env = "ENTITY_STACK_OUT")]
    pub out: PathBuf,

    /// Prefer podman over docker
    #[arg(long)]
    pub podman: bool,

    /// Only build this target
    #[arg(long)]
    pub only: Option<String>,
}

/// Pure function: assets to build, optionally narrowed to one target.
pub fn select_assets<'a>(
    manifest: &'a AssetManifest,
    only: Option<&str>,
) -> Result<Vec<&'a AssetEntry>> {
    match only {
        None => Ok(manifest.assets.iter().collect()),
        Some(target) => manifest
            .find(target)
            .map(|asset| vec![asset])
            .ok_or_else(|| BundleError::UnknownTarget(target.to_string())),
    }
}

fn read_manifest(out_dir: &Path) -> Result<AssetManifest> {
    let path = out_dir.join(ASSETS_FILE);
    if !path.exists() {
        return Err(BundleError::ManifestNotFound(path));
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_json::from_str(&contents).map_err(|source| BundleError::Manifest { path, source })
}

pub async fn run(command: BundleCommand, global: crate::Global) -> Result<()> {
    let manifest = read_manifest(&command.out)?;
    let assets = select_assets(&manifest, command.only.as_deref())?;
    let runtime = detect_runtime(command.podman).await?;

    if !global.is_silent() {
        aprintln!(
            "{} {} asset(s) with {}",
            p_b("Bundling"),
            assets.len(),
            p_c(runtime_command(runtime))
        );
    }

    let out_dir = std::path::absolute(&command.out)?;
    for asset in assets {
        let source_dir = std::path::absolute(&asset.source_path)?;
        let output_dir = asset_output_dir(&out_dir, asset);
        std::fs::create_dir_all(&output_dir)?;

        let args = bundle_run_args(asset, &source_dir, &output_dir);
        if global.is_verbose() {
            aprintln!("{} {} {}", p_m("$"), runtime_command(runtime), args.join(" "));
        }

        if let Err(e) = run_bundle(runtime, &args, &asset.target).await {
            aprintln!("{} {}", p_r("✗"), asset.target);
            return Err(e);
        }

        if !global.is_silent() {
            aprintln!(
                "{} {} -> {}",
                p_g("✓"),
                asset.target,
                output_dir.join(&asset.artifact).display()
            );
        }
    }

    Ok(())
}
