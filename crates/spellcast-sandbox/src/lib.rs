pub mod common;
pub mod env;
pub mod log;
pub mod runner;
pub mod runtime_resolver;

pub use env::{EnvironmentInfo, EnvironmentProvisioner};
pub use runner::{RunOptions, ScriptExecutor};
pub use runtime_resolver::{ResolvedRuntime, RuntimeResolver, PYTHON};
