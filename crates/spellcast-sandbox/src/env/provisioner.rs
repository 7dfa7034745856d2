use std::path::PathBuf;
use std::sync::Arc;

use spellcast_core::config::{PathsConfig, ProvisionConfig};
use spellcast_core::{Result, SpellError, StrategyFailure};

use super::layout::EnvLayout;
use super::strategy::{
    default_strategies, describe_embedded, describe_system, locate_builder, ProvisionContext,
    ProvisionStrategy, StrategyError,
};
use super::tools::{path_arg, probe_python_version, SystemToolRunner, ToolRunner};
use super::EnvironmentInfo;

/// Resolves a usable interpreter through an ordered strategy chain.
pub struct EnvironmentProvisioner {
    layout: EnvLayout,
    config: ProvisionConfig,
    manifest: PathBuf,
    runner: Arc<dyn ToolRunner>,
    strategies: Vec<Box<dyn ProvisionStrategy>>,
}

impl EnvironmentProvisioner {
    pub fn new(paths: &PathsConfig, config: ProvisionConfig) -> Self {
        Self {
            layout: EnvLayout::new(paths.env_dir.clone()),
            config,
            manifest: paths.requirements.clone(),
            runner: Arc::new(SystemToolRunner),
            strategies: default_strategies(),
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ProvisionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn layout(&self) -> &EnvLayout {
        &self.layout
    }

    fn context(&self) -> ProvisionContext<'_> {
        ProvisionContext {
            layout: &self.layout,
            config: &self.config,
            manifest: &self.manifest,
            runner: self.runner.as_ref(),
        }
    }

    /// Try each strategy in order; the first success wins. When all fail the
    /// error lists every attempt.
    pub fn resolve(&self) -> Result<EnvironmentInfo> {
        let ctx = self.context();
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.provision(&ctx) {
                Ok(info) => {
                    crate::progress!(
                        "Interpreter resolved via '{}': {} ({}, {})",
                        strategy.name(),
                        info.interpreter.display(),
                        info.version,
                        if info.is_embedded { "embedded" } else { "system" }
                    );
                    return Ok(info);
                }
                Err(e) => {
                    if matches!(e, StrategyError::Unavailable(_)) {
                        tracing::debug!(strategy = strategy.name(), reason = %e, "strategy not applicable");
                    } else {
                        tracing::warn!(strategy = strategy.name(), error = %e, "provisioning strategy failed");
                    }
                    attempts.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "all provisioning strategies failed");
        Err(SpellError::ProvisioningFailed { attempts })
    }

    /// Re-derive the description of an already provisioned interpreter.
    /// Only re-provisions when an embedded root has disappeared.
    pub fn describe(&self, info: &EnvironmentInfo) -> Result<EnvironmentInfo> {
        let ctx = self.context();
        if info.is_embedded {
            return match self.layout.interpreter() {
                Some(interpreter) => Ok(describe_embedded(&ctx, interpreter)),
                None => {
                    tracing::warn!(root = %self.layout.root().display(), "embedded environment missing, re-provisioning");
                    self.resolve()
                }
            };
        }
        let version = probe_python_version(ctx.runner, &info.interpreter)
            .unwrap_or_else(|| "Unknown".to_string());
        Ok(describe_system(ctx.runner, info.interpreter.clone(), version))
    }

    /// Install one package into the resolved environment. Never fails loudly:
    /// problems are logged and reported as `false`.
    pub fn install_package(&self, info: &EnvironmentInfo, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("refusing to install an empty package name");
            return false;
        }

        let ctx = self.context();
        let builder = if info.is_embedded {
            locate_builder(&ctx)
                .map_err(|e| tracing::debug!(error = %e, "builder unavailable, using pip"))
                .ok()
        } else {
            None
        };
        let (program, args): (PathBuf, Vec<String>) = match builder {
            Some(uv) => (
                uv,
                vec![
                    "pip".into(),
                    "install".into(),
                    name.to_string(),
                    "--python".into(),
                    path_arg(&info.interpreter),
                ],
            ),
            None => (
                info.interpreter.clone(),
                vec!["-m".into(), "pip".into(), "install".into(), name.to_string()],
            ),
        };

        match self.runner.run(&program, &args) {
            Ok(out) if out.success() => {
                crate::progress!("Installed package {}", name);
                true
            }
            Ok(out) => {
                tracing::warn!(package = name, reason = %out.failure_reason(), "package install failed");
                false
            }
            Err(e) => {
                tracing::warn!(package = name, program = %program.display(), error = %e, "package installer could not start");
                false
            }
        }
    }

    /// Remove the embedded environment. Returns the bytes freed, or `None`
    /// when there was nothing to remove. With `dry_run` nothing is deleted.
    pub fn clean(&self, dry_run: bool) -> Result<Option<u64>> {
        let root = self.layout.root();
        if !root.exists() {
            return Ok(None);
        }
        let size = self.layout.disk_usage();
        if !dry_run {
            self.layout.discard()?;
            tracing::info!(root = %root.display(), bytes = size, "embedded environment removed");
        }
        Ok(Some(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tools::testing::*;
    use crate::env::{BuildEmbedded, ReuseEmbedded, SystemInterpreter};
    use std::path::Path;

    fn paths(dir: &Path) -> PathsConfig {
        PathsConfig {
            home: dir.to_path_buf(),
            env_dir: dir.join("python-env"),
            spell_book: dir.join("spell_book.json"),
            scripts_dir: dir.join("scripts"),
            requirements: dir.join("requirements.txt"),
            clipboard_file: None,
        }
    }

    fn config() -> ProvisionConfig {
        ProvisionConfig {
            python_version: "3.11".into(),
            uv_path: Some(PathBuf::from("/opt/fake/uv")),
        }
    }

    fn fake_venv(root: &Path) {
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin").join("python"), "").unwrap();
        std::fs::create_dir_all(root.join("lib/python3.11/site-packages/requests-2.31.0.dist-info")).unwrap();
    }

    /// `uv venv <root>` creates a fake venv; everything else succeeds.
    fn building_runner() -> Arc<FakeToolRunner> {
        Arc::new(FakeToolRunner::new(|program, args| {
            let is_uv = program.file_name().map(|n| n == "uv").unwrap_or(false);
            if is_uv && args.first().map(String::as_str) == Some("venv") {
                fake_venv(Path::new(&args[1]));
            }
            if args.first().map(String::as_str) == Some("--version") && !is_uv {
                return ok("Python 3.11.9\n");
            }
            ok("uv 0.4.0\n")
        }))
    }

    #[test]
    fn test_reuse_never_invokes_builder() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        fake_venv(&paths.env_dir);
        let runner = building_runner();
        let provisioner =
            EnvironmentProvisioner::new(&paths, config()).with_runner(runner.clone());

        let info = provisioner.resolve().unwrap();
        assert!(info.is_embedded);
        assert_eq!(info.interpreter, paths.env_dir.join("bin").join("python"));
        assert_eq!(info.packages, vec!["requests"]);
        assert_eq!(info.version, "Python 3.11.9");
        assert_eq!(runner.calls_to("uv"), 0);
    }

    #[test]
    fn test_build_creates_env_and_installs_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        std::fs::write(&paths.requirements, "requests\n").unwrap();
        let runner = building_runner();
        let provisioner =
            EnvironmentProvisioner::new(&paths, config()).with_runner(runner.clone());

        let info = provisioner.resolve().unwrap();
        assert!(info.is_embedded);
        let calls = runner.calls.lock().unwrap();
        let uv_args: Vec<&Vec<String>> = calls
            .iter()
            .filter(|(p, _)| p.file_name().map(|n| n == "uv").unwrap_or(false))
            .map(|(_, a)| a)
            .collect();
        assert!(uv_args.iter().any(|a| a[0] == "venv" && a.contains(&"--seed".to_string())));
        assert!(uv_args.iter().any(|a| a[0] == "pip" && a[2] == "-r"));
    }

    #[test]
    fn test_install_failure_falls_back_to_system() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        std::fs::write(&paths.requirements, "doesnotexist\n").unwrap();
        let runner = Arc::new(FakeToolRunner::new(|program, args| {
            let is_uv = program.file_name().map(|n| n == "uv").unwrap_or(false);
            match args.first().map(String::as_str) {
                Some("venv") if is_uv => {
                    fake_venv(Path::new(&args[1]));
                    ok("")
                }
                Some("pip") if is_uv => fail(1, "No solution found"),
                Some("--version") if is_uv => ok("uv 0.4.0"),
                Some("--version") if program == Path::new("python3") => ok("Python 3.12.1"),
                Some("--version") => missing(),
                _ => ok(""),
            }
        }));
        let provisioner =
            EnvironmentProvisioner::new(&paths, config()).with_runner(runner.clone());

        let info = provisioner.resolve().unwrap();
        assert!(!info.is_embedded);
        assert_eq!(info.interpreter, PathBuf::from("python3"));
        assert_eq!(info.env_root, PathBuf::new());
        // Half-built root removed so the next startup retries the build.
        assert!(!paths.env_dir.exists());
    }

    #[test]
    fn test_all_strategies_fail_aggregates_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let runner = Arc::new(FakeToolRunner::new(|_, _| missing()));
        let provisioner = EnvironmentProvisioner::new(&paths, config())
            .with_runner(runner)
            .with_strategies(vec![
                Box::new(ReuseEmbedded),
                Box::new(BuildEmbedded),
                Box::new(SystemInterpreter {
                    candidates: vec![PathBuf::from("python3")],
                }),
            ]);

        match provisioner.resolve() {
            Err(SpellError::ProvisioningFailed { attempts }) => {
                let names: Vec<&str> = attempts.iter().map(|a| a.strategy.as_str()).collect();
                assert_eq!(names, vec!["reuse", "build", "system"]);
                assert!(attempts[1].reason.contains("builder not found"));
            }
            other => panic!("expected ProvisioningFailed, got {:?}", other.map(|i| i.interpreter)),
        }
    }

    #[test]
    fn test_venv_failure_reports_builder_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let runner = Arc::new(FakeToolRunner::new(|_, args| match args.first().map(String::as_str) {
            Some("venv") => fail(2, "python 3.11 not available"),
            Some("--version") => ok("uv 0.4.0"),
            _ => ok(""),
        }));
        let provisioner = EnvironmentProvisioner::new(&paths, config())
            .with_runner(runner)
            .with_strategies(vec![Box::new(BuildEmbedded)]);

        let err = provisioner.resolve().unwrap_err().to_string();
        assert!(err.contains("uv venv failed: python 3.11 not available"), "{}", err);
    }

    #[test]
    fn test_install_package_uses_builder_for_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        fake_venv(&paths.env_dir);
        let runner = building_runner();
        let provisioner =
            EnvironmentProvisioner::new(&paths, config()).with_runner(runner.clone());
        let info = provisioner.resolve().unwrap();

        assert!(provisioner.install_package(&info, "rich"));
        let calls = runner.calls.lock().unwrap();
        let (program, args) = calls.last().unwrap();
        assert_eq!(program.file_name().unwrap(), "uv");
        assert_eq!(args[..3], ["pip".to_string(), "install".to_string(), "rich".to_string()]);
    }

    #[test]
    fn test_install_package_returns_false_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let runner = Arc::new(FakeToolRunner::new(|_, _| fail(1, "no such package")));
        let provisioner = EnvironmentProvisioner::new(&paths, config()).with_runner(runner);
        let info = EnvironmentInfo {
            interpreter: PathBuf::from("python3"),
            package_manager: PathBuf::from("pip3"),
            env_root: PathBuf::new(),
            version: "Python 3.12".into(),
            is_embedded: false,
            packages: Vec::new(),
        };
        assert!(!provisioner.install_package(&info, "nope"));
        assert!(!provisioner.install_package(&info, "   "));
    }

    #[test]
    fn test_clean_dry_run_keeps_env() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let provisioner = EnvironmentProvisioner::new(&paths, config());
        assert_eq!(provisioner.clean(false).unwrap(), None);

        fake_venv(&paths.env_dir);
        assert!(provisioner.clean(true).unwrap().is_some());
        assert!(paths.env_dir.exists());
        assert!(provisioner.clean(false).unwrap().is_some());
        assert!(!paths.env_dir.exists());
    }
}
