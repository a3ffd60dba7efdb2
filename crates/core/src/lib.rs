//! Pure synthesis core for the entity API infrastructure.
//!
//! Turns a deployment config into CloudFormation templates for two stacks:
//! `tables` owns the primary DynamoDB table, `api` owns the REST API and its
//! Lambda functions and references the table through stack exports.
//!
//! Nothing in this crate performs I/O.
//!
//! ```
//! use entity_stack_core::{synthesize, AssetSource, DeployConfig, Environment};
//!
//! let config = DeployConfig::new(
//!     Environment::new("123456789012", "us-east-1"),
//!     "https://app.example.com",
//! );
//! let source = AssetSource::new("src", "0123456789abcdef").unwrap();
//!
//! let assembly = synthesize(&config, &source).unwrap();
//! assert_eq!(assembly.stacks.len(), 2);
//! ```

pub mod api;
pub mod assembly;
pub mod assets;
pub mod config;
pub mod error;
pub mod lambda;
pub mod plan;
pub mod stack;
pub mod tables;
pub mod template;

pub use assembly::{synthesize, AssemblyManifest, CloudAssembly, StackArtifact};
pub use assets::{AssetEntry, AssetManifest, AssetSource};
pub use config::{DeployConfig, Environment};
pub use error::{ConfigError, Result, SynthError};
pub use plan::{calculate_delete_plan, calculate_plan, format_plan, StackPlan};
pub use stack::Stack;
pub use template::{LogicalId, Template};
