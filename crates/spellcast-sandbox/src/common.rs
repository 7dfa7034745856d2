//! Common utilities for script execution
//!
//! Shared constants plus the child-process helpers used by the executor:
//! temp-script creation, background output readers and termination.

use std::path::Path;
use std::time::Duration;

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

// ============================================================
// Execution Constants (Single Source of Truth)
// ============================================================

/// File-name prefix of inline-script temp files
pub const TEMP_SCRIPT_PREFIX: &str = "spell_";

/// File-name suffix of inline-script temp files
pub const TEMP_SCRIPT_SUFFIX: &str = ".py";

/// How long a timed-out process gets to exit after SIGTERM before it is killed
pub const TERMINATION_GRACE: Duration = Duration::from_secs(2);

/// Write `code` to a uniquely named temp file. The returned path deletes the
/// file when dropped; the handle itself is already closed.
pub fn write_temp_script(dir: Option<&Path>, code: &str) -> std::io::Result<TempPath> {
    use std::io::Write;

    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_SCRIPT_PREFIX).suffix(TEMP_SCRIPT_SUFFIX);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Drain a child stream to completion on a background task.
///
/// Both pipes are read while the process runs; otherwise output larger than
/// the pipe buffer blocks the child and `wait()` never returns.
pub fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            if let Err(e) = stream.read_to_end(&mut buf).await {
                tracing::debug!(error = %e, "child stream read ended early");
            }
        }
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

/// Output collected by a reader task. A cancelled or panicked reader yields "".
pub async fn collect_output(task: &mut JoinHandle<String>) -> String {
    task.await.unwrap_or_default()
}

/// Stop a timed-out run: SIGTERM first (unix), then a hard kill once
/// [`TERMINATION_GRACE`] has passed.
///
/// `group` is the process group the child leads, if any. Signalling the group
/// also reaches background processes the script left behind, which may still
/// hold its output pipes open after the script itself exited.
pub async fn terminate(child: &mut Child, group: Option<u32>) {
    if send_signal(child, group, Signal::Term) {
        if let Ok(Ok(status)) = tokio::time::timeout(TERMINATION_GRACE, child.wait()).await {
            tracing::debug!(?status, "child exited after SIGTERM");
            return;
        }
    }
    send_signal(child, group, Signal::Kill);
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "kill failed; child already gone");
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(child: &Child, group: Option<u32>, signal: Signal) -> bool {
    use nix::sys::signal::{kill, killpg, Signal as NixSignal};
    use nix::unistd::Pid;

    let sig = match signal {
        Signal::Term => NixSignal::SIGTERM,
        Signal::Kill => NixSignal::SIGKILL,
    };
    let sent = match (group, child.id()) {
        (Some(pgid), _) => killpg(Pid::from_raw(pgid as i32), sig),
        (None, Some(pid)) => kill(Pid::from_raw(pid as i32), sig),
        (None, None) => return false,
    };
    match sent {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(?signal, error = %e, "signal not delivered");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_signal(_child: &Child, _group: Option<u32>, _signal: Signal) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_script_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp_script(Some(dir.path()), "print('hi')").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_SCRIPT_PREFIX));
        assert!(name.ends_with(TEMP_SCRIPT_SUFFIX));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')");
        drop(path);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_script_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_temp_script(Some(dir.path()), "").unwrap();
        let b = write_temp_script(Some(dir.path()), "").unwrap();
        assert_ne!(a.to_path_buf(), b.to_path_buf());
    }

    #[tokio::test]
    async fn test_reader_trims_and_handles_missing_stream() {
        let data: &[u8] = b"  hello \n";
        assert_eq!(collect_output(&mut spawn_reader(Some(data))).await, "hello");
        assert_eq!(collect_output(&mut spawn_reader(None::<&'static [u8]>)).await, "");
    }
}
