//! ScriptExecutor: one time-bounded child-process run per call.
//!
//! Inline scripts are written to a uniquely named temp file that is removed
//! on every exit path (success, non-zero exit, timeout, spawn failure). The
//! executor keeps no state between calls, so concurrent runs only share the
//! temp-file namespace.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use spellcast_core::spell::ScriptSource;
use spellcast_core::{ExecutionResult, Result, SpellError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::common::{collect_output, spawn_reader, terminate, write_temp_script};
use crate::runtime_resolver::ResolvedRuntime;

/// Options for one run. Exactly one of `inline_script` / `script_file` must be set.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub inline_script: Option<String>,
    pub script_file: Option<PathBuf>,
    /// Appended after the script path
    pub args: Vec<String>,
    /// Written to stdin, which is then closed. `None` gives the script an empty stdin.
    pub stdin_data: Option<String>,
    /// `None` or zero waits indefinitely
    pub timeout: Option<Duration>,
    pub working_dir: Option<PathBuf>,
    /// Merged over the runtime's base environment
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn inline(code: impl Into<String>) -> Self {
        Self {
            inline_script: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            script_file: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_source(source: &ScriptSource) -> Self {
        match source {
            ScriptSource::Inline(code) => Self::inline(code.clone()),
            ScriptSource::File(path) => Self::file(path.clone()),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin_data = Some(data.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Runs scripts against one resolved interpreter.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    runtime: ResolvedRuntime,
    temp_dir: Option<PathBuf>,
}

impl ScriptExecutor {
    pub fn new(runtime: ResolvedRuntime) -> Self {
        Self {
            runtime,
            temp_dir: None,
        }
    }

    /// Place inline-script temp files in `dir` instead of the OS temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.runtime.interpreter
    }

    /// Run one script to completion.
    ///
    /// Exit code 0 yields `Ok`. A non-zero exit yields [`SpellError::Execution`]
    /// with the full result; a fired timer yields [`SpellError::Timeout`] and the
    /// process is terminated; a process that cannot start yields [`SpellError::Spawn`].
    pub async fn run(&self, options: RunOptions) -> Result<ExecutionResult> {
        let RunOptions {
            inline_script,
            script_file,
            args,
            stdin_data,
            timeout,
            working_dir,
            env,
        } = options;

        let source = ScriptSource::from_parts(inline_script, script_file)?;
        // A zero timeout means no timeout.
        let timeout = timeout.filter(|t| !t.is_zero());
        // `_temp_script` lives until this function returns, on every path.
        let (script_path, _temp_script) = match source {
            ScriptSource::Inline(code) => {
                let temp = write_temp_script(self.temp_dir.as_deref(), &code)?;
                (temp.to_path_buf(), Some(temp))
            }
            ScriptSource::File(path) => (path, None),
        };

        let mut cmd = Command::new(&self.runtime.interpreter);
        cmd.arg(&script_path)
            .args(&args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can also stop what the script forked.
        #[cfg(unix)]
        cmd.process_group(0);
        for (key, value) in self.runtime.extra_env.iter().chain(env.iter()) {
            cmd.env(key, value);
        }
        if let Some(ref dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            interpreter = %self.runtime.interpreter.display(),
            script = %script_path.display(),
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "spawning script"
        );

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| SpellError::Spawn {
            program: self.runtime.interpreter.clone(),
            source,
        })?;

        let stdin_task = match (child.stdin.take(), stdin_data) {
            (Some(mut stdin), Some(data)) => Some(tokio::spawn(async move {
                // A script that exits without reading its input closes the pipe first.
                if let Err(e) = stdin.write_all(data.as_bytes()).await {
                    tracing::debug!(error = %e, "stdin write interrupted");
                }
                // Dropping `stdin` here closes the stream.
            })),
            _ => None,
        };
        #[cfg(unix)]
        let group = child.id();
        #[cfg(not(unix))]
        let group = None;
        let mut stdout_task = spawn_reader(child.stdout.take());
        let mut stderr_task = spawn_reader(child.stderr.take());

        // The run is complete once the process exited and both pipes closed.
        // A forked background process can hold the pipes open past the exit,
        // so the timer covers the readers too.
        let completion = async {
            let status = child.wait().await?;
            let stdout = collect_output(&mut stdout_task).await;
            let stderr = collect_output(&mut stderr_task).await;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };
        let finished = match timeout {
            Some(limit) => tokio::time::timeout(limit, completion).await.ok(),
            None => Some(completion.await),
        };
        let (status, stdout, stderr) = match finished {
            Some(done) => done?,
            None => {
                // Timer won. Whatever the process does from here on is discarded.
                let limit = timeout.unwrap_or_default();
                tracing::warn!(
                    script = %script_path.display(),
                    timeout_ms = limit.as_millis() as u64,
                    "script timed out, terminating"
                );
                terminate(&mut child, group).await;
                stdout_task.abort();
                stderr_task.abort();
                if let Some(task) = stdin_task {
                    task.abort();
                }
                return Err(SpellError::Timeout { timeout: limit });
            }
        };

        let result = ExecutionResult {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            success: status.success(),
            execution_time: start.elapsed(),
        };

        tracing::debug!(
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "script finished"
        );

        if result.success {
            Ok(result)
        } else {
            Err(SpellError::Execution(Box::new(result)))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// `/bin/sh` stands in for the interpreter: inline "scripts" are shell.
    fn sh(temp: &Path) -> ScriptExecutor {
        ScriptExecutor::new(ResolvedRuntime::new("/bin/sh")).with_temp_dir(Some(temp.to_path_buf()))
    }

    fn leftover(temp: &Path) -> usize {
        std::fs::read_dir(temp).unwrap().count()
    }

    #[tokio::test]
    async fn test_stdin_uppercase() {
        let temp = tempfile::tempdir().unwrap();
        let result = sh(temp.path())
            .run(RunOptions::inline("tr '[:lower:]' '[:upper:]'").with_stdin("abc"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "ABC");
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_output_is_trimmed_and_stdin_empty_without_input() {
        let temp = tempfile::tempdir().unwrap();
        let result = sh(temp.path())
            .run(RunOptions::inline("printf '  x  \\n'; cat; echo warn >&2"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "x");
        assert_eq!(result.stderr, "warn");
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let temp = tempfile::tempdir().unwrap();
        let err = sh(temp.path())
            .run(RunOptions::inline("echo partial; echo oops >&2; exit 3"))
            .await
            .unwrap_err();
        match err {
            SpellError::Execution(result) => {
                assert_eq!(result.exit_code, 3);
                assert_eq!(result.stderr, "oops");
                assert_eq!(result.stdout, "partial");
                assert!(!result.success);
            }
            other => panic!("expected Execution, got {other:?}"),
        }
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_timeout_terminates_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let started = Instant::now();
        let err = sh(temp.path())
            .run(RunOptions::inline("exec sleep 10").with_timeout(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, SpellError::Timeout { timeout } if timeout == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_timeout_covers_output_held_by_background_process() {
        let temp = tempfile::tempdir().unwrap();
        let started = Instant::now();
        let err = sh(temp.path())
            .run(RunOptions::inline("sleep 5 & echo hi").with_timeout(Duration::from_millis(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, SpellError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_zero_timeout_means_no_limit() {
        let temp = tempfile::tempdir().unwrap();
        let result = sh(temp.path())
            .run(RunOptions::inline("sleep 0.05; echo hi").with_timeout(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result.stdout, "hi");
    }

    #[tokio::test]
    async fn test_finishes_before_timeout() {
        let temp = tempfile::tempdir().unwrap();
        let result = sh(temp.path())
            .run(RunOptions::inline("echo done").with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result.stdout, "done");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_distinct_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let exec = ScriptExecutor::new(ResolvedRuntime::new("/nonexistent/python"))
            .with_temp_dir(Some(temp.path().to_path_buf()));
        let err = exec.run(RunOptions::inline("print(1)")).await.unwrap_err();
        assert!(matches!(err, SpellError::Spawn { .. }), "{err:?}");
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_source_must_be_exactly_one() {
        let temp = tempfile::tempdir().unwrap();
        let exec = sh(temp.path());
        let neither = exec.run(RunOptions::default()).await.unwrap_err();
        assert!(matches!(neither, SpellError::Configuration(_)));

        let both = RunOptions {
            inline_script: Some("echo".into()),
            script_file: Some(PathBuf::from("/tmp/x.py")),
            ..Default::default()
        };
        assert!(matches!(exec.run(both).await.unwrap_err(), SpellError::Configuration(_)));
        assert_eq!(leftover(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_args_env_and_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let work_path = std::fs::canonicalize(work.path()).unwrap();
        let exec = ScriptExecutor::new(ResolvedRuntime {
            interpreter: PathBuf::from("/bin/sh"),
            extra_env: vec![("SPELL_BASE".into(), "base".into()), ("SPELL_VAR".into(), "old".into())],
        })
        .with_temp_dir(Some(temp.path().to_path_buf()));

        let result = exec
            .run(
                RunOptions::inline("echo \"$1-$2 $SPELL_BASE $SPELL_VAR\"; pwd -P")
                    .with_args(vec!["a".into(), "b".into()])
                    .with_env("SPELL_VAR", "new")
                    .with_working_dir(&work_path),
            )
            .await
            .unwrap();
        let lines: Vec<&str> = result.stdout.lines().collect();
        assert_eq!(lines[0], "a-b base new");
        assert_eq!(lines[1], work_path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_script_file_is_left_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let scripts = tempfile::tempdir().unwrap();
        let script = scripts.path().join("count.sh");
        std::fs::write(&script, "wc -c | tr -d ' '").unwrap();

        let result = sh(temp.path())
            .run(RunOptions::file(&script).with_stdin("hello"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "5");
        assert!(script.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_do_not_collide() {
        let temp = tempfile::tempdir().unwrap();
        let exec = Arc::new(sh(temp.path()));
        let mut handles = Vec::new();
        for i in 0..8 {
            let exec = Arc::clone(&exec);
            handles.push(tokio::spawn(async move {
                exec.run(RunOptions::inline(format!("sleep 0.1; echo run-{i}")))
                    .await
                    .map(|r| r.stdout)
            }));
        }
        let mut outputs = Vec::new();
        for h in handles {
            outputs.push(h.await.unwrap().unwrap());
        }
        outputs.sort();
        let expected: Vec<String> = {
            let mut v: Vec<String> = (0..8).map(|i| format!("run-{i}")).collect();
            v.sort();
            v
        };
        assert_eq!(outputs, expected);
        assert_eq!(leftover(temp.path()), 0);
    }
}
