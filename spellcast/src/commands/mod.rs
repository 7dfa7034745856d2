//! CLI commands. This layer is the external dispatcher: it builds the
//! provisioner and registry, reads input text and prints results.
//!
//! Commands that cast provision the interpreter first; catalog commands never
//! execute anything and skip provisioning.

pub mod cast;
pub mod env;
pub mod slot;
pub mod spell;

use std::io::{IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use spellcast_core::config::{ExecutionConfig, PathsConfig, ProvisionConfig};
use spellcast_registry::{FileSharedText, SpellRegistry};
use spellcast_sandbox::env::EnvLayout;
use spellcast_sandbox::{
    EnvironmentInfo, EnvironmentProvisioner, ResolvedRuntime, RuntimeResolver, ScriptExecutor, PYTHON,
};

use crate::cli::Cli;
use crate::observability::CliNotifier;

/// Configuration resolved once per invocation: env vars, then CLI overrides.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub paths: PathsConfig,
    pub provision: ProvisionConfig,
    pub execution: ExecutionConfig,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut paths = PathsConfig::from_env();
        if let Some(ref p) = cli.spell_book {
            paths.spell_book = p.clone();
        }
        if let Some(ref p) = cli.clipboard {
            paths.clipboard_file = Some(p.clone());
        }
        Self {
            paths,
            provision: ProvisionConfig::from_env(),
            execution: ExecutionConfig::from_env().with_timeout_override(cli.timeout),
        }
    }

    pub fn provisioner(&self) -> EnvironmentProvisioner {
        EnvironmentProvisioner::new(&self.paths, self.provision.clone())
    }

    pub fn resolve_environment(&self) -> Result<EnvironmentInfo> {
        self.provisioner()
            .resolve()
            .context("Failed to provision a Python interpreter")
    }

    /// Registry ready to cast: the interpreter is provisioned first.
    pub fn casting_registry(&self) -> Result<SpellRegistry> {
        let info = self.resolve_environment()?;
        let runtime = info
            .resolve(PYTHON)
            .context("Resolved environment has no Python runtime")?;
        tracing::debug!(
            interpreter = %runtime.interpreter.display(),
            embedded = info.is_embedded,
            "runtime resolved"
        );
        self.build_registry(runtime)
    }

    /// Registry for catalog management only.
    pub fn catalog_registry(&self) -> Result<SpellRegistry> {
        let layout = EnvLayout::new(self.paths.env_dir.clone());
        self.build_registry(ResolvedRuntime::new(layout.expected_interpreter()))
    }

    fn build_registry(&self, runtime: ResolvedRuntime) -> Result<SpellRegistry> {
        let executor = ScriptExecutor::new(runtime).with_temp_dir(self.execution.temp_dir.clone());
        let mut builder = SpellRegistry::builder(executor, &self.paths)
            .execution_config(self.execution.clone())
            .notifications(Arc::new(CliNotifier::from_env()));
        if let Some(ref file) = self.paths.clipboard_file {
            builder = builder.shared_text(Arc::new(FileSharedText::new(file.clone())));
        }
        builder.build().with_context(|| {
            format!(
                "Failed to load spell book {}",
                self.paths.spell_book.display()
            )
        })
    }
}

/// Input text: the `--input` value, else stdin. An interactive stdin gives "".
pub fn read_input(input: Option<String>) -> Result<String> {
    if let Some(text) = input {
        return Ok(text);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("Failed to read input from stdin")?;
    Ok(text)
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}
