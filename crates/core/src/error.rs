//! Core synthesis error types (pure - no I/O variants).

use thiserror::Error;

/// Errors raised while parsing or validating the deployment config document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Malformed config document: {0}")]
    Malformed(String),

    #[error("Missing required config key `{0}`")]
    MissingKey(&'static str),

    #[error("Invalid account id '{0}': expected 12 digits")]
    InvalidAccount(String),

    #[error("Invalid region '{0}'")]
    InvalidRegion(String),

    #[error("Invalid CORS origin header: {0}")]
    InvalidCorsOrigin(String),

    #[error("Missing event operation `{0}` required by event handlers")]
    MissingEventOperation(&'static str),
}

/// Errors raised while building the resource graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Construct id '{0}' does not produce a valid logical id")]
    InvalidConstructId(String),

    #[error("Duplicate logical id '{logical_id}' in stack '{stack}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("Duplicate resource path '{0}'")]
    DuplicatePath(String),

    #[error("Duplicate export '{0}'")]
    DuplicateExport(String),

    #[error("Invalid asset fingerprint '{0}': expected at least 8 hex characters")]
    InvalidFingerprint(String),

    #[error("Template serialization failed: {0}")]
    Serialization(String),
}

/// Result type for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;
