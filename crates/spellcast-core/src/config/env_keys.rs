//! Environment variable keys and their aliases.
//!
//! Primary keys use the `SPELLCAST_*` prefix; aliases keep older names working.

/// Data root and the files/directories beneath it
pub mod paths {
    pub const SPELLCAST_HOME: &str = "SPELLCAST_HOME";
    pub const HOME_ALIASES: &[&str] = &["SPELLCAST_DATA_DIR"];

    pub const SPELLCAST_ENV_DIR: &str = "SPELLCAST_ENV_DIR";
    pub const ENV_DIR_ALIASES: &[&str] = &["SPELLCAST_PYTHON_ENV"];

    pub const SPELLCAST_SPELL_BOOK: &str = "SPELLCAST_SPELL_BOOK";

    pub const SPELLCAST_SCRIPTS_DIR: &str = "SPELLCAST_SCRIPTS_DIR";

    pub const SPELLCAST_REQUIREMENTS: &str = "SPELLCAST_REQUIREMENTS";

    pub const SPELLCAST_CLIPBOARD_FILE: &str = "SPELLCAST_CLIPBOARD_FILE";
}

/// Interpreter provisioning
pub mod provision {
    pub const SPELLCAST_PYTHON_VERSION: &str = "SPELLCAST_PYTHON_VERSION";

    /// Explicit path to the environment builder (`uv`)
    pub const SPELLCAST_UV: &str = "SPELLCAST_UV";
    pub const UV_ALIASES: &[&str] = &["UV_BIN"];
}

/// Script execution limits
pub mod execution {
    pub const SPELLCAST_TIMEOUT_MS: &str = "SPELLCAST_TIMEOUT_MS";
    pub const SPELLCAST_TEST_TIMEOUT_MS: &str = "SPELLCAST_TEST_TIMEOUT_MS";
    pub const SPELLCAST_TEMP_DIR: &str = "SPELLCAST_TEMP_DIR";
}

/// Logging and the cast log
pub mod observability {
    pub const SPELLCAST_QUIET: &str = "SPELLCAST_QUIET";

    pub const SPELLCAST_LOG_LEVEL: &str = "SPELLCAST_LOG_LEVEL";

    pub const SPELLCAST_LOG_JSON: &str = "SPELLCAST_LOG_JSON";

    pub const SPELLCAST_CAST_LOG: &str = "SPELLCAST_CAST_LOG";
    pub const CAST_LOG_ALIASES: &[&str] = &["SPELLCAST_AUDIT_LOG"];
}
