//! Deployment config document (Functional Core - pure data).
//!
//! The config is read once by the shell and handed to each unit's constructor.
//! Nothing in this crate reads it from ambient state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Event operation name the `eventAction` handler subscribes to.
pub const EVENT_ACTION_OPERATION: &str = "eventActionEvent";

/// Target account and region of every stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Returns the `aws://<account>/<region>` form used in the assembly manifest.
    pub fn uri(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }

    /// Validates the account id and region shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.len() != 12 || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidAccount(self.account.clone()));
        }
        if !is_valid_region(&self.region) {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }
        Ok(())
    }
}

/// Parsed and validated deployment config.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployConfig {
    pub environment: Environment,
    pub cors_allow_origin_header: String,
    /// Free-form value carried through untouched.
    pub config_item: Option<serde_json::Value>,
    pub event_operations: BTreeMap<String, String>,
    /// Re-activates the SNS driven event handlers.
    pub event_handlers: bool,
}

/// Wire shape of the config file. Required keys are optional here so that a
/// missing key maps to [`ConfigError::MissingKey`] instead of a serde message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    cdk_environment: Option<Environment>,
    cors_allow_origin_header: Option<String>,
    #[serde(default)]
    config_item: Option<serde_json::Value>,
    #[serde(default)]
    event_operations: BTreeMap<String, String>,
    #[serde(default)]
    event_handlers: bool,
}

impl DeployConfig {
    /// Creates a config with only the required values set.
    pub fn new(environment: Environment, cors_allow_origin_header: impl Into<String>) -> Self {
        Self {
            environment,
            cors_allow_origin_header: cors_allow_origin_header.into(),
            config_item: None,
            event_operations: BTreeMap::new(),
            event_handlers: false,
        }
    }

    /// Enables the event handlers with the given operation names.
    pub fn with_event_handlers<I, K, V>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.event_operations = operations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.event_handlers = true;
        self
    }

    /// Parses and validates a config document.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_stack_core::DeployConfig;
    ///
    /// let config = DeployConfig::from_json(r#"{
    ///     "cdkEnvironment": { "account": "123456789012", "region": "us-east-1" },
    ///     "corsAllowOriginHeader": "https://app.example.com"
    /// }"#).unwrap();
    /// assert_eq!(config.environment.region, "us-east-1");
    /// assert!(!config.event_handlers);
    ///
    /// assert!(DeployConfig::from_json(r#"{ "corsAllowOriginHeader": "*" }"#).is_err());
    /// ```
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(contents).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let environment = raw
            .cdk_environment
            .ok_or(ConfigError::MissingKey("cdkEnvironment"))?;
        let cors_allow_origin_header = raw
            .cors_allow_origin_header
            .ok_or(ConfigError::MissingKey("corsAllowOriginHeader"))?
            .trim()
            .to_string();

        let config = Self {
            environment,
            cors_allow_origin_header,
            config_item: raw.config_item,
            event_operations: raw.event_operations,
            event_handlers: raw.event_handlers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates every value synthesis depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.environment.validate()?;

        let origin = self.cors_allow_origin_header.as_str();
        if origin.trim().is_empty() {
            return Err(ConfigError::InvalidCorsOrigin("value is empty".to_string()));
        }
        // Emitted verbatim into headers and Lambda environments.
        if origin.trim() != origin {
            return Err(ConfigError::InvalidCorsOrigin(format!(
                "'{}' has surrounding whitespace",
                origin
            )));
        }
        // Embedded as a single-quoted literal in gateway response mappings.
        if origin.contains('\'') {
            return Err(ConfigError::InvalidCorsOrigin(format!(
                "'{}' contains a single quote",
                origin
            )));
        }

        if self.event_handlers && !self.event_operations.contains_key(EVENT_ACTION_OPERATION) {
            return Err(ConfigError::MissingEventOperation(EVENT_ACTION_OPERATION));
        }

        Ok(())
    }

    /// Returns the operation name for a key of `eventOperations`.
    pub fn event_operation(&self, key: &str) -> Option<&str> {
        self.event_operations.get(key).map(String::as_str)
    }
}

/// Checks a region has the `aa-bbbb-N` shape (`us-east-1`, `us-gov-west-1`).
fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let Some((number, words)) = parts.split_last() else {
        return false;
    };

    !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && words[0].len() == 2
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
}
