//! External tool invocation used during provisioning.
//!
//! Provisioning talks to the outside world only through [`ToolRunner`], so
//! tests can swap in a recording double and count builder invocations.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of one synchronous tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, for version probes that print to either stream.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    /// Short failure description: trimmed stderr, else the exit code.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` to completion and capture its output.
    /// `Err` means the program could not be started at all.
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ToolOutput>;
}

/// Runs tools as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ToolOutput> {
        tracing::debug!(program = %program.display(), ?args, "running tool");
        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        Ok(ToolOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}

/// Query `<interpreter> --version`. Returns the trimmed version line when the
/// interpreter answers successfully and identifies itself as Python.
pub fn probe_python_version(runner: &dyn ToolRunner, interpreter: &Path) -> Option<String> {
    let out = runner.run(interpreter, &["--version".to_string()]).ok()?;
    let text = out.combined();
    if out.success() && text.contains("Python") {
        Some(text.trim().to_string())
    } else {
        None
    }
}

pub(crate) fn path_arg(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

/// Locations probed for the environment builder after the explicit override and `PATH`.
pub(crate) fn builder_fallback_locations() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = dirs::home_dir() {
        out.push(home.join(".local").join("bin").join("uv"));
        out.push(home.join(".cargo").join("bin").join("uv"));
    }
    out.push(PathBuf::from("/usr/local/bin/uv"));
    out.push(PathBuf::from("/usr/bin/uv"));
    out
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_probe_accepts_stderr_version() {
        let runner = FakeToolRunner::new(|_, _| {
            Ok(ToolOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: "Python 2.7.18\n".into(),
            })
        });
        assert_eq!(
            probe_python_version(&runner, Path::new("python")).as_deref(),
            Some("Python 2.7.18")
        );
    }

    #[test]
    fn test_probe_rejects_non_python_and_failures() {
        let runner = FakeToolRunner::new(|_, _| ok("node v20"));
        assert!(probe_python_version(&runner, Path::new("python")).is_none());
        let runner = FakeToolRunner::new(|_, _| fail(1, "Python broken"));
        assert!(probe_python_version(&runner, Path::new("python")).is_none());
        let runner = FakeToolRunner::new(|_, _| missing());
        assert!(probe_python_version(&runner, Path::new("python")).is_none());
    }

    #[test]
    fn test_failure_reason_prefers_stderr() {
        let out = ToolOutput {
            code: Some(2),
            stdout: String::new(),
            stderr: "  no such python  \n".into(),
        };
        assert_eq!(out.failure_reason(), "no such python");
        let out = ToolOutput {
            code: Some(2),
            ..Default::default()
        };
        assert_eq!(out.failure_reason(), "exited with code 2");
    }
}
