//! Reading and writing the cloud assembly directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use entity_stack_core::assembly::{ASSETS_FILE, MANIFEST_FILE};
use entity_stack_core::{AssemblyManifest, CloudAssembly, Template};
use serde::Serialize;

use crate::error::{OutputError, Result};

pub const DEFAULT_OUT_DIR: &str = "cdk.out";

/// Pure function: every file of the assembly with its contents, in write order.
pub fn render_assembly(assembly: &CloudAssembly) -> Result<Vec<(String, String)>> {
    let mut files = Vec::with_capacity(assembly.stacks.len() + 2);
    for stack in &assembly.stacks {
        files.push((stack.template_file(), stack.template.to_json_pretty()?));
    }
    files.push((MANIFEST_FILE.to_string(), to_json(MANIFEST_FILE, &assembly.manifest())?));
    files.push((ASSETS_FILE.to_string(), to_json(ASSETS_FILE, &assembly.assets)?));
    Ok(files)
}

/// Writes the assembly into `out_dir`, creating it when needed.
///
/// Everything is rendered before the directory is touched.
pub fn write_assembly(out_dir: &Path, assembly: &CloudAssembly) -> Result<Vec<PathBuf>> {
    let files = render_assembly(assembly)?;

    std::fs::create_dir_all(out_dir).map_err(|e| OutputError::io(out_dir, e))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = out_dir.join(name);
        std::fs::write(&path, contents).map_err(|e| OutputError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "Wrote file");
        written.push(path);
    }
    Ok(written)
}

/// Reads the templates of a previously written assembly, keyed by stack name.
///
/// A missing directory or manifest means nothing was synthesized yet.
pub fn read_templates(out_dir: &Path) -> Result<BTreeMap<String, Template>> {
    let manifest_path = out_dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Ok(BTreeMap::new());
    }

    let manifest: AssemblyManifest = read_json(&manifest_path)?;

    let mut templates = BTreeMap::new();
    for (name, artifact) in manifest.stacks {
        let path = out_dir.join(&artifact.template_file);
        let contents = std::fs::read_to_string(&path).map_err(|e| OutputError::io(&path, e))?;
        templates.insert(name, Template::from_json(&contents)?);
    }
    Ok(templates)
}

fn to_json<T: Serialize>(name: &str, value: &T) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(value).map_err(|e| OutputError::json(name, e))?;
    rendered.push('\n');
    Ok(rendered)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| OutputError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| OutputError::json(path, e))
}
