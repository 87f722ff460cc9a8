//! Error trigger: surfaces the most recent operational failure
//!
//! Loops and handlers report failures here instead of crashing. The stored
//! record carries an expiry timestamp checked lazily on read, so the flag
//! clears itself without a background task.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Snapshot of the most recent unresolved error
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSnapshot {
    pub message: String,
    pub context: String,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Record {
    message: String,
    context: String,
    reported_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct ErrorTrigger {
    enabled: bool,
    clear_after: Duration,
    record: RwLock<Option<Record>>,
}

impl ErrorTrigger {
    pub fn new(enabled: bool, clear_after_minutes: i64) -> Self {
        Self {
            enabled,
            clear_after: Duration::minutes(clear_after_minutes),
            record: RwLock::new(None),
        }
    }

    /// Record a failure. Always logged; retained for the dashboard only when
    /// the trigger is enabled.
    pub fn report<E: fmt::Display>(&self, error: E, context: &str) {
        tracing::error!(context = %context, "Error triggered: {}", error);

        if !self.enabled {
            return;
        }

        let now = Utc::now();
        *self.record.write() = Some(Record {
            message: error.to_string(),
            context: context.to_string(),
            reported_at: now,
            expires_at: now + self.clear_after,
        });
    }

    pub fn has_error(&self) -> bool {
        self.has_error_at(Utc::now())
    }

    pub fn last_error(&self) -> Option<ErrorSnapshot> {
        self.last_error_at(Utc::now())
    }

    pub fn has_error_at(&self, now: DateTime<Utc>) -> bool {
        self.last_error_at(now).is_some()
    }

    pub fn last_error_at(&self, now: DateTime<Utc>) -> Option<ErrorSnapshot> {
        let record = self.record.read();
        record
            .as_ref()
            .filter(|r| r.expires_at > now)
            .map(|r| ErrorSnapshot {
                message: r.message.clone(),
                context: r.context.clone(),
                reported_at: r.reported_at,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_sets_flag() {
        let trigger = ErrorTrigger::new(true, 30);
        assert!(!trigger.has_error());

        trigger.report("boom", "webhook delivery");
        assert!(trigger.has_error());

        let snapshot = trigger.last_error().unwrap();
        assert_eq!(snapshot.message, "boom");
        assert_eq!(snapshot.context, "webhook delivery");
    }

    #[test]
    fn test_flag_expires_lazily() {
        let trigger = ErrorTrigger::new(true, 30);
        trigger.report("boom", "webhook delivery");

        let now = Utc::now();
        assert!(trigger.has_error_at(now + Duration::minutes(29)));
        assert!(!trigger.has_error_at(now + Duration::minutes(31)));
        // A later report resets the window
        trigger.report("boom again", "webhook delivery");
        assert!(trigger.has_error_at(now + Duration::minutes(31)));
    }

    #[test]
    fn test_disabled_trigger_keeps_nothing() {
        let trigger = ErrorTrigger::new(false, 30);
        trigger.report("boom", "webhook delivery");
        assert!(!trigger.has_error());
        assert!(trigger.last_error().is_none());
    }

    #[test]
    fn test_newer_report_replaces_older() {
        let trigger = ErrorTrigger::new(true, 30);
        trigger.report("first", "a");
        trigger.report("second", "b");
        assert_eq!(trigger.last_error().unwrap().message, "second");
    }
}
