//! Interpreter environment provisioning.
//!
//! The provisioner walks an ordered list of strategies (reuse the embedded
//! venv, build it, fall back to a system interpreter) and hands back an
//! [`EnvironmentInfo`]. The executor only ever sees the interpreter path and
//! base environment derived from it.

pub mod layout;
pub mod provisioner;
pub mod strategy;
pub mod tools;

use serde::Serialize;
use std::path::PathBuf;

pub use layout::EnvLayout;
pub use provisioner::EnvironmentProvisioner;
pub use strategy::{
    default_strategies, BuildEmbedded, ProvisionContext, ProvisionStrategy, ReuseEmbedded,
    StrategyError, SystemInterpreter,
};
pub use tools::{SystemToolRunner, ToolOutput, ToolRunner};

/// A resolved interpreter. Immutable once provisioning succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub interpreter: PathBuf,
    pub package_manager: PathBuf,
    /// Embedded environment root. Empty `PathBuf` for a system interpreter.
    pub env_root: PathBuf,
    pub version: String,
    pub is_embedded: bool,
    pub packages: Vec<String>,
}
