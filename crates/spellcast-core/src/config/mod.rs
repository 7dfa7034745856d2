//! Spellcast configuration layer.
//!
//! Every environment variable is read here; the rest of the code goes
//! through the structured configs instead of calling `std::env::var`.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `.env` loading
//! - `schema`: `PathsConfig`, `ProvisionConfig`, `ExecutionConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants and aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_u64, load_dotenv, remove_env_var, set_env_var};
pub use schema::{
    ExecutionConfig, ObservabilityConfig, PathsConfig, ProvisionConfig, DEFAULT_PYTHON_VERSION,
    DEFAULT_SPELL_TIMEOUT_MS, DEFAULT_TEST_TIMEOUT_MS,
};
