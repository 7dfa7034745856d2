//! Per-invocation execution result.

use std::time::Duration;

use serde::Serialize;

/// Captured output of one script run. Returned by value, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
    pub exit_code: i32,
    /// True iff the exit code is zero and no timeout fired
    pub success: bool,
    #[serde(rename = "executionTime", serialize_with = "as_millis")]
    pub execution_time: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
