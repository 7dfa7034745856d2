//! Per-cast notification payloads. Displaying them is someone else's job.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use spellcast_core::SpellError;

/// One notification per cast outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastNotification {
    pub timestamp: DateTime<Utc>,
    pub spell_id: String,
    pub spell_name: String,
    pub success: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Error kind and message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    pub title: String,
    pub body: String,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl CastNotification {
    pub fn succeeded(spell_id: &str, spell_name: &str, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            spell_id: spell_id.to_string(),
            spell_name: spell_name.to_string(),
            success: true,
            elapsed,
            error: None,
            error_kind: None,
            title: format!("✨ {spell_name}"),
            body: format!("Cast in {}ms", elapsed.as_millis()),
        }
    }

    pub fn failed(spell_id: &str, spell_name: &str, elapsed: Duration, err: &SpellError) -> Self {
        let message = err.to_string();
        // Notifications are single-line; stderr can be long.
        let first_line = message.lines().next().unwrap_or_default().to_string();
        Self {
            timestamp: Utc::now(),
            spell_id: spell_id.to_string(),
            spell_name: spell_name.to_string(),
            success: false,
            elapsed,
            error: Some(message),
            error_kind: Some(err.kind()),
            title: format!("❌ {spell_name} failed"),
            body: first_line,
        }
    }
}

/// Receives cast notifications. Must not block for long: it runs on the cast path.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &CastNotification);
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: &CastNotification) {}
}

impl<F> NotificationSink for F
where
    F: Fn(&CastNotification) + Send + Sync,
{
    fn notify(&self, notification: &CastNotification) {
        self(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_notification_is_single_line() {
        let err = SpellError::Execution(Box::new(spellcast_core::ExecutionResult {
            stdout: String::new(),
            stderr: "Traceback\n  line 1\nValueError".into(),
            exit_code: 1,
            success: false,
            execution_time: Duration::from_millis(12),
        }));
        let n = CastNotification::failed("s", "Shout", Duration::from_millis(15), &err);
        assert!(!n.success);
        assert_eq!(n.body, "script exited with code 1: Traceback");
        assert!(n.error.as_deref().unwrap().contains("ValueError"));
        assert_eq!(n.error_kind, Some("execution"));
    }

    #[test]
    fn test_notification_serializes_elapsed_ms() {
        let n = CastNotification::succeeded("s", "Shout", Duration::from_millis(42));
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["elapsed_ms"], 42);
        assert_eq!(v["success"], true);
        assert!(v.get("error").is_none());
        assert_eq!(n.body, "Cast in 42ms");
    }
}
