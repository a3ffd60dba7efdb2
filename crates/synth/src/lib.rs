//! Imperative shell around `entity_stack_core`: loads the config, fingerprints
//! the Lambda sources and reads or writes the cloud assembly directory.

pub mod commands;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod output;

pub use error::{OutputError, Result};
