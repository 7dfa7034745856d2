//! RuntimeResolver trait: turns a provisioned environment into what the
//! executor needs to spawn a script (interpreter path plus base env vars).
//!
//! The executor never looks at [`EnvironmentInfo`] directly.

use std::path::PathBuf;

use crate::env::EnvironmentInfo;

/// Language key for spells.
pub const PYTHON: &str = "python";

/// Resolved runtime for a given language: interpreter path and optional env vars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuntime {
    /// Path to the interpreter executable
    pub interpreter: PathBuf,
    /// Base environment for every run, applied before per-call variables
    pub extra_env: Vec<(String, String)>,
}

impl ResolvedRuntime {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            extra_env: Vec::new(),
        }
    }
}

/// Resolves the interpreter for a language.
/// Returns `None` if the language is not supported.
pub trait RuntimeResolver: Send + Sync {
    fn resolve(&self, language: &str) -> Option<ResolvedRuntime>;
}

impl RuntimeResolver for EnvironmentInfo {
    fn resolve(&self, language: &str) -> Option<ResolvedRuntime> {
        if language != PYTHON {
            return None;
        }
        let mut extra_env = vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())];
        if self.is_embedded {
            extra_env.push((
                "VIRTUAL_ENV".to_string(),
                self.env_root.to_string_lossy().to_string(),
            ));
            if let Some(bin) = self.interpreter.parent() {
                let mut dirs = vec![bin.to_path_buf()];
                if let Some(path) = std::env::var_os("PATH") {
                    dirs.extend(std::env::split_paths(&path));
                }
                match std::env::join_paths(dirs) {
                    Ok(joined) => extra_env.push(("PATH".to_string(), joined.to_string_lossy().to_string())),
                    Err(e) => tracing::warn!(error = %e, "could not prepend environment bin dir to PATH"),
                }
            }
        }
        Some(ResolvedRuntime {
            interpreter: self.interpreter.clone(),
            extra_env,
        })
    }
}

/// A fixed runtime resolves to itself for every language.
impl RuntimeResolver for ResolvedRuntime {
    fn resolve(&self, _language: &str) -> Option<ResolvedRuntime> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(is_embedded: bool) -> EnvironmentInfo {
        EnvironmentInfo {
            interpreter: PathBuf::from("/data/python-env/bin/python"),
            package_manager: PathBuf::from("/data/python-env/bin/pip"),
            env_root: if is_embedded {
                PathBuf::from("/data/python-env")
            } else {
                PathBuf::new()
            },
            version: "Python 3.11.9".into(),
            is_embedded,
            packages: Vec::new(),
        }
    }

    fn lookup<'a>(rt: &'a ResolvedRuntime, key: &str) -> Option<&'a str> {
        rt.extra_env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_embedded_runtime_activates_venv() {
        let rt = info(true).resolve(PYTHON).unwrap();
        assert_eq!(rt.interpreter, PathBuf::from("/data/python-env/bin/python"));
        assert_eq!(lookup(&rt, "VIRTUAL_ENV"), Some("/data/python-env"));
        assert!(lookup(&rt, "PATH").unwrap().starts_with("/data/python-env/bin"));
        assert_eq!(lookup(&rt, "PYTHONIOENCODING"), Some("utf-8"));
    }

    #[test]
    fn test_system_runtime_has_no_venv_vars() {
        let rt = info(false).resolve(PYTHON).unwrap();
        assert!(lookup(&rt, "VIRTUAL_ENV").is_none());
        assert!(lookup(&rt, "PATH").is_none());
        assert!(info(false).resolve("node").is_none());
    }
}
