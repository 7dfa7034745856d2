//! Config structs grouped by concern, all loaded from the environment.

use super::env_keys::{execution, observability as obv_keys, paths, provision};
use super::loader::{env_bool, env_optional, env_or, env_u64, load_dotenv};
use std::path::PathBuf;
use std::time::Duration;

/// Default spell timeout when a spell does not set one.
pub const DEFAULT_SPELL_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for ad-hoc `test_spell` runs.
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 10_000;

/// Interpreter version the embedded environment is pinned to.
pub const DEFAULT_PYTHON_VERSION: &str = "3.11";

/// Data root and everything stored under it.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Data root (`~/.spellcast`)
    pub home: PathBuf,
    /// Embedded interpreter environment root
    pub env_dir: PathBuf,
    /// Persisted spell book document
    pub spell_book: PathBuf,
    /// Where file-based built-in spells are materialized
    pub scripts_dir: PathBuf,
    /// Dependency manifest installed into a freshly built environment
    pub requirements: PathBuf,
    /// Optional file standing in for the shared clipboard
    pub clipboard_file: Option<PathBuf>,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let home = env_optional(paths::SPELLCAST_HOME, paths::HOME_ALIASES)
            .map(PathBuf::from)
            .unwrap_or_else(default_home);
        Self::with_home(home)
    }

    /// Derive every path from `home`, letting individual env overrides win.
    pub fn with_home(home: PathBuf) -> Self {
        let env_dir = env_optional(paths::SPELLCAST_ENV_DIR, paths::ENV_DIR_ALIASES)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("python-env"));
        let spell_book = env_optional(paths::SPELLCAST_SPELL_BOOK, &[])
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("spell_book.json"));
        let scripts_dir = env_optional(paths::SPELLCAST_SCRIPTS_DIR, &[])
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("scripts"));
        let requirements = env_optional(paths::SPELLCAST_REQUIREMENTS, &[])
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("requirements.txt"));
        let clipboard_file = env_optional(paths::SPELLCAST_CLIPBOARD_FILE, &[]).map(PathBuf::from);
        Self {
            home,
            env_dir,
            spell_book,
            scripts_dir,
            requirements,
            clipboard_file,
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".spellcast")
}

/// Embedded-environment provisioning settings.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub python_version: String,
    /// Explicit builder executable; skips discovery when set
    pub uv_path: Option<PathBuf>,
}

impl ProvisionConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            python_version: env_or(provision::SPELLCAST_PYTHON_VERSION, &[], || {
                DEFAULT_PYTHON_VERSION.to_string()
            }),
            uv_path: env_optional(provision::SPELLCAST_UV, provision::UV_ALIASES).map(PathBuf::from),
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
            uv_path: None,
        }
    }
}

/// Script execution settings.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub default_timeout: Duration,
    pub test_timeout: Duration,
    /// Directory for inline-script temp files; `None` means the OS temp dir
    pub temp_dir: Option<PathBuf>,
}

impl ExecutionConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            default_timeout: timeout_env(execution::SPELLCAST_TIMEOUT_MS, DEFAULT_SPELL_TIMEOUT_MS),
            test_timeout: timeout_env(execution::SPELLCAST_TEST_TIMEOUT_MS, DEFAULT_TEST_TIMEOUT_MS),
            temp_dir: env_optional(execution::SPELLCAST_TEMP_DIR, &[]).map(PathBuf::from),
        }
    }

    /// Override the default timeout (CLI `--timeout`).
    pub fn with_timeout_override(mut self, timeout_ms: Option<u64>) -> Self {
        if let Some(ms) = timeout_ms.filter(|&ms| ms > 0) {
            self.default_timeout = Duration::from_millis(ms);
        }
        self
    }
}

/// A timeout variable in milliseconds; 0 keeps the default.
fn timeout_env(key: &str, default_ms: u64) -> Duration {
    match env_u64(key, &[], default_ms) {
        0 => Duration::from_millis(default_ms),
        ms => Duration::from_millis(ms),
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_SPELL_TIMEOUT_MS),
            test_timeout: Duration::from_millis(DEFAULT_TEST_TIMEOUT_MS),
            temp_dir: None,
        }
    }
}

/// Observability: quiet, log level, JSON logs, cast log path.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub cast_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            load_dotenv();
            Self {
                quiet: env_bool(obv_keys::SPELLCAST_QUIET, &[], false),
                log_level: env_or(obv_keys::SPELLCAST_LOG_LEVEL, &[], || {
                    "spellcast=info".to_string()
                }),
                log_json: env_bool(obv_keys::SPELLCAST_LOG_JSON, &[], false),
                cast_log: env_optional(obv_keys::SPELLCAST_CAST_LOG, obv_keys::CAST_LOG_ALIASES),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_home() {
        let home = PathBuf::from("/tmp/spellcast-home-test");
        let cfg = PathsConfig::with_home(home.clone());
        // Individual overrides are unset in the test environment.
        if std::env::var(paths::SPELLCAST_SPELL_BOOK).is_err() {
            assert_eq!(cfg.spell_book, home.join("spell_book.json"));
        }
        if std::env::var(paths::SPELLCAST_SCRIPTS_DIR).is_err() {
            assert_eq!(cfg.scripts_dir, home.join("scripts"));
        }
    }

    #[test]
    fn test_timeout_override() {
        let cfg = ExecutionConfig::default().with_timeout_override(Some(1500));
        assert_eq!(cfg.default_timeout, Duration::from_millis(1500));
        let cfg = ExecutionConfig::default().with_timeout_override(None);
        assert_eq!(cfg.default_timeout, Duration::from_millis(DEFAULT_SPELL_TIMEOUT_MS));
        let cfg = ExecutionConfig::default().with_timeout_override(Some(0));
        assert_eq!(cfg.default_timeout, Duration::from_millis(DEFAULT_SPELL_TIMEOUT_MS));
    }
}
