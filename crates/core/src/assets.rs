//! Lambda code assets and the manifest handed to the build step.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

pub const ASSET_MANIFEST_VERSION: u32 = 1;

/// Length of the fingerprint prefix embedded in asset ids.
const FINGERPRINT_PREFIX_LEN: usize = 12;

/// The Lambda source tree, identified by a content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    pub source_path: String,
    pub fingerprint: String,
}

impl AssetSource {
    /// Creates a source, checking the fingerprint is lowercase hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_stack_core::AssetSource;
    ///
    /// let source = AssetSource::new("src", "0123456789abcdef0123").unwrap();
    /// assert_eq!(source.asset_id("create"), "0123456789ab-create");
    ///
    /// assert!(AssetSource::new("src", "xyz").is_err());
    /// ```
    pub fn new(source_path: impl Into<String>, fingerprint: impl Into<String>) -> Result<Self> {
        let fingerprint = fingerprint.into();
        let is_hex = fingerprint
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if fingerprint.len() < 8 || !is_hex {
            return Err(SynthError::InvalidFingerprint(fingerprint));
        }

        Ok(Self {
            source_path: source_path.into(),
            fingerprint,
        })
    }

    /// Asset id for a build target: fingerprint prefix plus target name.
    pub fn asset_id(&self, target: &str) -> String {
        let prefix_len = self.fingerprint.len().min(FINGERPRINT_PREFIX_LEN);
        format!("{}-{}", &self.fingerprint[..prefix_len], target)
    }
}

/// How one asset is built and where the deployment step expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub id: String,
    pub target: String,
    pub source_path: String,
    pub image: String,
    pub command: Vec<String>,
    /// File the build must leave in its output directory.
    pub artifact: String,
    pub object_key: String,
}

/// Every asset referenced by the assembly, sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub version: u32,
    pub assets: Vec<AssetEntry>,
}

impl AssetManifest {
    pub fn new(mut assets: Vec<AssetEntry>) -> Self {
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        assets.dedup_by(|a, b| a.id == b.id);
        Self {
            version: ASSET_MANIFEST_VERSION,
            assets,
        }
    }

    pub fn find(&self, target: &str) -> Option<&AssetEntry> {
        self.assets.iter().find(|a| a.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, target: &str) -> AssetEntry {
        AssetEntry {
            id: id.to_string(),
            target: target.to_string(),
            source_path: "src".to_string(),
            image: "golang:1.21.3".to_string(),
            command: vec!["bash".to_string()],
            artifact: "bootstrap".to_string(),
            object_key: format!("{}.zip", id),
        }
    }

    #[test]
    fn test_fingerprint_must_be_hex() {
        assert!(AssetSource::new("src", "ABCDEF0123").is_err());
        assert!(AssetSource::new("src", "abc").is_err());
        assert!(AssetSource::new("src", "abcdef0123").is_ok());
    }

    #[test]
    fn test_asset_id_short_fingerprint() {
        let source = AssetSource::new("src", "abcdef01").unwrap();
        assert_eq!(source.asset_id("read"), "abcdef01-read");
    }

    #[test]
    fn test_manifest_sorted_and_deduplicated() {
        let manifest = AssetManifest::new(vec![
            entry("b-read", "read"),
            entry("a-create", "create"),
            entry("b-read", "read"),
        ]);

        let ids: Vec<&str> = manifest.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-create", "b-read"]);
        assert_eq!(manifest.version, ASSET_MANIFEST_VERSION);
        assert_eq!(manifest.find("create").map(|a| a.id.as_str()), Some("a-create"));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let value = serde_json::to_value(entry("a-create", "create")).unwrap();
        assert_eq!(value["sourcePath"], serde_json::json!("src"));
        assert_eq!(value["objectKey"], serde_json::json!("a-create.zip"));
    }
}
