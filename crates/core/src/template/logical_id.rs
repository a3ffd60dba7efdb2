//! Logical ids derived from construct ids.

use std::fmt;

use crate::error::{Result, SynthError};

/// A CloudFormation logical id (alphanumeric, PascalCase).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derives a logical id from a kebab or snake case construct id.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_stack_core::template::LogicalId;
    ///
    /// let id = LogicalId::from_construct_id("request-authorizer-lambda").unwrap();
    /// assert_eq!(id.as_str(), "RequestAuthorizerLambda");
    ///
    /// let id = LogicalId::from_construct_id("{entityId}").unwrap();
    /// assert_eq!(id.as_str(), "EntityId");
    ///
    /// assert!(LogicalId::from_construct_id("--").is_err());
    /// ```
    pub fn from_construct_id(construct_id: &str) -> Result<Self> {
        let id = pascal_case(construct_id);
        if id.is_empty() {
            return Err(SynthError::InvalidConstructId(construct_id.to_string()));
        }
        Ok(Self(id))
    }

    /// Derives the logical id of a construct nested under this one.
    pub fn child(&self, construct_id: &str) -> Result<Self> {
        let suffix = pascal_case(construct_id);
        if suffix.is_empty() {
            return Err(SynthError::InvalidConstructId(construct_id.to_string()));
        }
        Ok(Self(format!("{}{}", self.0, suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn pascal_case(input: &str) -> String {
    input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
