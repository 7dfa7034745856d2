pub mod config;
pub mod error;
pub mod outcome;
pub mod spell;

pub use error::{Result, SpellError, StrategyFailure};
pub use outcome::ExecutionResult;
