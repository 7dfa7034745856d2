//! Provisioning strategies, tried in order by the provisioner.
//!
//! 1. [`ReuseEmbedded`]: an interpreter already sits in the embedded root.
//! 2. [`BuildEmbedded`]: create the root with the builder and install the manifest.
//! 3. [`SystemInterpreter`]: first system interpreter that answers `--version`.

use std::path::{Path, PathBuf};

use spellcast_core::config::ProvisionConfig;
use spellcast_core::SpellError;
use thiserror::Error;

use super::layout::EnvLayout;
use super::tools::{builder_fallback_locations, path_arg, probe_python_version, ToolRunner};
use super::EnvironmentInfo;

/// Everything a strategy may look at or invoke.
pub struct ProvisionContext<'a> {
    pub layout: &'a EnvLayout,
    pub config: &'a ProvisionConfig,
    /// Dependency manifest (`requirements.txt`); installed only if it exists
    pub manifest: &'a Path,
    pub runner: &'a dyn ToolRunner,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    /// Precondition not met; the next strategy should be tried.
    #[error("{0}")]
    Unavailable(String),

    #[error("{tool} failed: {reason}")]
    Tool { tool: &'static str, reason: String },

    #[error(transparent)]
    Spell(#[from] SpellError),
}

pub trait ProvisionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn provision(&self, ctx: &ProvisionContext<'_>) -> Result<EnvironmentInfo, StrategyError>;
}

/// The default chain: reuse, build, system.
pub fn default_strategies() -> Vec<Box<dyn ProvisionStrategy>> {
    vec![
        Box::new(ReuseEmbedded),
        Box::new(BuildEmbedded),
        Box::new(SystemInterpreter::default()),
    ]
}

/// Describe an embedded environment. Only the interpreter itself is invoked;
/// packages come from a filesystem scan.
pub(crate) fn describe_embedded(ctx: &ProvisionContext<'_>, interpreter: PathBuf) -> EnvironmentInfo {
    let version = probe_python_version(ctx.runner, &interpreter).unwrap_or_else(|| "Unknown".to_string());
    EnvironmentInfo {
        interpreter,
        package_manager: ctx.layout.package_manager(),
        env_root: ctx.layout.root().to_path_buf(),
        version,
        is_embedded: true,
        packages: ctx.layout.installed_packages(),
    }
}

/// Describe a system interpreter. `env_root` is empty: there is no isolated environment.
pub(crate) fn describe_system(runner: &dyn ToolRunner, interpreter: PathBuf, version: String) -> EnvironmentInfo {
    let packages = runner
        .run(
            &interpreter,
            &["-m".into(), "pip".into(), "list".into(), "--format=freeze".into()],
        )
        .ok()
        .filter(|o| o.success())
        .map(|o| parse_pip_freeze(&o.stdout))
        .unwrap_or_default();
    EnvironmentInfo {
        package_manager: sibling_pip(&interpreter),
        interpreter,
        env_root: PathBuf::new(),
        version,
        is_embedded: false,
        packages,
    }
}

fn sibling_pip(interpreter: &Path) -> PathBuf {
    let name = if cfg!(windows) { "pip.exe" } else { "pip3" };
    match interpreter.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Package names from `pip list --format=freeze` output.
pub(crate) fn parse_pip_freeze(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("-e"))
        .filter_map(|l| {
            let name = l.split("==").next()?.split(" @ ").next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Find a working builder: explicit config, then `PATH`, then fixed locations.
pub(crate) fn locate_builder(ctx: &ProvisionContext<'_>) -> Result<PathBuf, SpellError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(ref p) = ctx.config.uv_path {
        candidates.push(p.clone());
    }
    if let Ok(p) = which::which("uv") {
        candidates.push(p);
    }
    for p in builder_fallback_locations() {
        if !candidates.contains(&p) {
            candidates.push(p);
        }
    }

    for candidate in &candidates {
        match ctx.runner.run(candidate, &["--version".to_string()]) {
            Ok(out) if out.success() => {
                tracing::debug!(builder = %candidate.display(), version = %out.stdout.trim(), "builder located");
                return Ok(candidate.clone());
            }
            _ => continue,
        }
    }
    Err(SpellError::BuilderNotFound {
        searched: candidates.iter().map(|p| path_arg(p)).collect(),
    })
}

pub struct ReuseEmbedded;

impl ProvisionStrategy for ReuseEmbedded {
    fn name(&self) -> &'static str {
        "reuse"
    }

    fn provision(&self, ctx: &ProvisionContext<'_>) -> Result<EnvironmentInfo, StrategyError> {
        let interpreter = ctx.layout.interpreter().ok_or_else(|| {
            StrategyError::Unavailable(format!(
                "no embedded interpreter under {}",
                ctx.layout.root().display()
            ))
        })?;
        Ok(describe_embedded(ctx, interpreter))
    }
}

pub struct BuildEmbedded;

impl ProvisionStrategy for BuildEmbedded {
    fn name(&self) -> &'static str {
        "build"
    }

    fn provision(&self, ctx: &ProvisionContext<'_>) -> Result<EnvironmentInfo, StrategyError> {
        let uv = locate_builder(ctx)?;
        let root = ctx.layout.root();

        // A root without an interpreter is a leftover from an interrupted build.
        if root.exists() {
            ctx.layout.discard().map_err(SpellError::from)?;
        }

        crate::progress!(
            "Creating embedded environment at {} (python {})",
            root.display(),
            ctx.config.python_version
        );
        let out = ctx
            .runner
            .run(
                &uv,
                &[
                    "venv".into(),
                    path_arg(root),
                    "--python".into(),
                    ctx.config.python_version.clone(),
                    "--seed".into(),
                ],
            )
            .map_err(|e| StrategyError::Tool {
                tool: "uv venv",
                reason: e.to_string(),
            })?;
        if !out.success() {
            return Err(StrategyError::Tool {
                tool: "uv venv",
                reason: out.failure_reason(),
            });
        }

        let interpreter = ctx.layout.interpreter().ok_or_else(|| {
            StrategyError::Unavailable(format!(
                "builder succeeded but no interpreter at {}",
                ctx.layout.expected_interpreter().display()
            ))
        })?;

        if ctx.manifest.exists() {
            crate::progress!("Installing dependencies from {}", ctx.manifest.display());
            let result = ctx.runner.run(
                &uv,
                &[
                    "pip".into(),
                    "install".into(),
                    "-r".into(),
                    path_arg(ctx.manifest),
                    "--python".into(),
                    path_arg(&interpreter),
                ],
            );
            let failure = match result {
                Ok(out) if out.success() => None,
                Ok(out) => Some(out.failure_reason()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                // Embedded only counts as provisioned with its dependencies.
                // Drop the half-built root so the next startup rebuilds it.
                if let Err(e) = ctx.layout.discard() {
                    tracing::warn!(error = %e, "failed to remove partially built environment");
                }
                return Err(StrategyError::Tool {
                    tool: "uv pip install",
                    reason,
                });
            }
        } else {
            tracing::debug!(manifest = %ctx.manifest.display(), "no dependency manifest, skipping install");
        }

        Ok(describe_embedded(ctx, interpreter))
    }
}

/// Probe a fixed, prioritized list of system interpreters.
pub struct SystemInterpreter {
    pub candidates: Vec<PathBuf>,
}

impl Default for SystemInterpreter {
    fn default() -> Self {
        let mut names = vec![
            "python3",
            "python",
            "/usr/bin/python3",
            "/usr/local/bin/python3",
            "python3.11",
            "python3.10",
            "python3.9",
        ];
        if cfg!(windows) {
            names.extend(["py", "python.exe"]);
        }
        Self {
            candidates: names.into_iter().map(PathBuf::from).collect(),
        }
    }
}

impl ProvisionStrategy for SystemInterpreter {
    fn name(&self) -> &'static str {
        "system"
    }

    fn provision(&self, ctx: &ProvisionContext<'_>) -> Result<EnvironmentInfo, StrategyError> {
        for candidate in &self.candidates {
            if let Some(version) = probe_python_version(ctx.runner, candidate) {
                crate::progress!("Using system interpreter {} ({})", candidate.display(), version);
                return Ok(describe_system(ctx.runner, candidate.clone(), version));
            }
            tracing::debug!(candidate = %candidate.display(), "system interpreter candidate rejected");
        }
        Err(StrategyError::Unavailable(format!(
            "none of {} system interpreter candidates answered --version",
            self.candidates.len()
        )))
    }
}
