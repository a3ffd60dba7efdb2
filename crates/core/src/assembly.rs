//! Entry point: config in, cloud assembly out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::{Api, ApiProps};
use crate::assets::{AssetManifest, AssetSource};
use crate::config::DeployConfig;
use crate::error::Result;
use crate::stack::Stack;
use crate::tables::Tables;

/// Version written into `manifest.json`.
pub const ASSEMBLY_VERSION: &str = "36.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ASSETS_FILE: &str = "assets.json";

/// Every stack of one synthesis run, in deployment order.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    pub stacks: Vec<Stack>,
    pub assets: AssetManifest,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: String,
    pub stacks: BTreeMap<String, StackArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    pub template_file: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// Validates `config`, then builds the tables stack and the api stack with
/// the table handle injected.
///
/// Nothing is built when the config is invalid.
pub fn synthesize(config: &DeployConfig, source: &AssetSource) -> Result<CloudAssembly> {
    config.validate()?;

    let tables = Tables::new(config.environment.clone())?;
    let api = Api::new(ApiProps {
        config,
        primary_table: tables.primary_table(),
        assets: source,
    })?;

    let (api_stack, assets) = api.into_parts();
    Ok(CloudAssembly {
        stacks: vec![tables.into_stack(), api_stack],
        assets: AssetManifest::new(assets),
    })
}

impl CloudAssembly {
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn manifest(&self) -> AssemblyManifest {
        let stacks = self
            .stacks
            .iter()
            .map(|stack| {
                (
                    stack.name.clone(),
                    StackArtifact {
                        template_file: stack.template_file(),
                        environment: stack.environment.uri(),
                        dependencies: stack.dependencies.clone(),
                    },
                )
            })
            .collect();

        AssemblyManifest {
            version: ASSEMBLY_VERSION.to_string(),
            stacks,
        }
    }
}
