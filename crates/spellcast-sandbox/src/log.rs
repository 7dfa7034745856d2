//! Progress lines for environment provisioning.
//!
//! Building the embedded environment (venv creation, manifest install) can
//! take a while on first run, so each step is reported at INFO. Hotkey
//! daemons and scripted callers set SPELLCAST_QUIET=1 to drop these lines;
//! warnings and failures go through `tracing` directly and are never muted.

/// `tracing::info!` unless quiet mode is on.
#[macro_export]
macro_rules! progress {
    ($($arg:tt)*) => {{
        if !$crate::log::quiet() {
            tracing::info!(target: "spellcast::provision", $($arg)*);
        }
    }};
}

pub fn quiet() -> bool {
    spellcast_core::config::ObservabilityConfig::from_env().quiet
}
