//! Content fingerprint of the Lambda source tree.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{OutputError, Result};

pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Hashes every file under `root` in path order.
///
/// Paths are hashed relative to `root` with `/` separators, so the same tree
/// fingerprints identically wherever it is checked out.
pub fn fingerprint_dir(root: &Path) -> Result<String> {
    if !root.is_dir() {
        return Err(OutputError::MissingSource(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let contents = std::fs::read(&file).map_err(|e| OutputError::io(&file, e))?;
        let relative = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((relative, contents));
    }

    let fingerprint = fingerprint_entries(&entries);
    tracing::debug!(
        root = %root.display(),
        files = entries.len(),
        %fingerprint,
        "Fingerprinted source"
    );
    Ok(fingerprint)
}

/// Pure function: SHA-256 over `(path, contents)` pairs, lowercase hex.
pub fn fingerprint_entries(entries: &[(String, Vec<u8>)]) -> String {
    let mut hasher = Sha256::new();
    for (path, contents) in entries {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(contents);
    }
    format!("{:x}", hasher.finalize())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| OutputError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| OutputError::io(dir, e))?;
        let path = entry.path();
        // `file_type` does not follow symlinks; linked directories are skipped.
        let file_type = entry.file_type().map_err(|e| OutputError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
