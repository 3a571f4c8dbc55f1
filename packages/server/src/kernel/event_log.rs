//! Event log backed by `tracing`.

use serde_json::Value;
use tracing::warn;

use super::traits::{BaseEventLog, LogEntry};

/// Forwards log entries to the tracing subscriber as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl BaseEventLog for TracingEventLog {
    fn record(&self, entry: &LogEntry) {
        let context = Value::Object(entry.context.clone());
        warn!(
            category = entry.category,
            context = %context,
            "{}",
            entry.message
        );
    }
}
