use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse asset manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Asset manifest {0} not found. Run `entity-stack synth` first")]
    ManifestNotFound(PathBuf),

    #[error("No asset for target '{0}'")]
    UnknownTarget(String),

    #[error("Container runtime not found: {0}")]
    ContainerRuntimeNotFound(String),

    #[error("Bundling '{target}' failed with {status}")]
    BuildFailed {
        target: String,
        status: std::process::ExitStatus,
    },
}

pub type Result<T> = std::result::Result<T, BundleError>;
