//! Observability: tracing init and the cast log.
//!
//! Uses config::ObservabilityConfig for SPELLCAST_QUIET, LOG_LEVEL, LOG_JSON, CAST_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use spellcast_core::config::ObservabilityConfig;
use spellcast_registry::{CastNotification, NotificationSink};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When SPELLCAST_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level: String = if cfg.quiet {
        "spellcast=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn append_jsonl(path: &Path, record: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn cast_record(n: &CastNotification) -> serde_json::Value {
    json!({
        "ts": n.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "event": if n.success { "cast_succeeded" } else { "cast_failed" },
        "spell_id": n.spell_id,
        "spell_name": n.spell_name,
        "success": n.success,
        "elapsed_ms": n.elapsed.as_millis() as u64,
        "error": n.error,
    })
}

/// Notification sink for the CLI: prints a one-line summary to stderr and
/// appends every cast to the cast log when one is configured.
pub struct CliNotifier {
    cast_log: Option<PathBuf>,
    quiet: bool,
}

impl CliNotifier {
    pub fn from_env() -> Self {
        let cfg = ObservabilityConfig::from_env();
        Self {
            cast_log: cfg
                .cast_log
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            quiet: cfg.quiet,
        }
    }
}

impl NotificationSink for CliNotifier {
    fn notify(&self, n: &CastNotification) {
        if let Some(ref path) = self.cast_log {
            append_jsonl(path, &cast_record(n));
        }
        if !self.quiet || !n.success {
            eprintln!("{}: {}", n.title, n.body);
        }
    }
}
