use std::path::Path;

use entity_stack_core::DeployConfig;

use crate::error::{OutputError, Result};

/// Default config document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config-dev.json";

/// Reads, parses and validates the deployment config document.
pub fn load_config(path: &Path) -> Result<DeployConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| OutputError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;

    let config = DeployConfig::from_json(&contents).map_err(|source| OutputError::Config {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        environment = %config.environment.uri(),
        event_handlers = config.event_handlers,
        "Loaded config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use entity_stack_core::ConfigError;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"{
                "cdkEnvironment": { "account": "123456789012", "region": "us-east-1" },
                "corsAllowOriginHeader": "https://app.example.com"
            }"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.environment.account, "123456789012");
        assert!(!config.event_handlers);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let file = write_config(
            r#"{ "cdkEnvironment": { "account": "123456789012", "region": "us-east-1" } }"#,
        );

        let error = load_config(file.path()).unwrap_err();
        assert!(matches!(
            error,
            OutputError::Config {
                source: ConfigError::MissingKey("corsAllowOriginHeader"),
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_account_is_config_error() {
        let file = write_config(
            r#"{
                "cdkEnvironment": { "account": "1234", "region": "us-east-1" },
                "corsAllowOriginHeader": "*"
            }"#,
        );

        let error = load_config(file.path()).unwrap_err();
        assert!(matches!(
            error,
            OutputError::Config {
                source: ConfigError::InvalidAccount(_),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_config(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(error, OutputError::ReadConfig { .. }));
    }
}
