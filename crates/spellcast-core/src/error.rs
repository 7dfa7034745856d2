//! Error taxonomy shared by the provisioner, executor and registry.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::outcome::ExecutionResult;

pub type Result<T> = std::result::Result<T, SpellError>;

/// One failed provisioning strategy, kept so the final error can show the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum SpellError {
    /// Malformed invocation: missing/duplicate script source, slot out of range, bad patch.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("spell not found: {0}")]
    NotFound(String),

    #[error("no spell assigned to quick slot {0}")]
    NotAssigned(u8),

    #[error("environment builder not found (searched: {})", .searched.join(", "))]
    BuilderNotFound { searched: Vec<String> },

    #[error("no interpreter could be provisioned: {}", format_attempts(.attempts))]
    ProvisioningFailed { attempts: Vec<StrategyFailure> },

    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script exited with code {}: {}", .0.exit_code, .0.stderr)]
    Execution(Box<ExecutionResult>),

    #[error("script timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    #[error("failed to persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SpellError {
    /// Short machine-readable kind, used in notifications and the cast log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::NotFound(_) => "not_found",
            Self::NotAssigned(_) => "not_assigned",
            Self::BuilderNotFound { .. } => "builder_not_found",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::Spawn { .. } => "spawn",
            Self::Execution(_) => "execution",
            Self::Timeout { .. } => "timeout",
            Self::Persistence { .. } => "persistence",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

fn format_attempts(attempts: &[StrategyFailure]) -> String {
    if attempts.is_empty() {
        return "no strategies configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
