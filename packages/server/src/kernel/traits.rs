// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Naming convention: Base* for trait names (e.g., BaseEventLog)

use serde::Serialize;
use serde_json::{Map, Value};

// =============================================================================
// Event Log Trait (Infrastructure - structured failure logging)
// =============================================================================

/// A structured log payload: human message, category symbol and context.
///
/// The core decides the payload; formatting is up to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub category: &'static str,
    pub context: Map<String, Value>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, category: &'static str) -> Self {
        Self {
            message: message.into(),
            category,
            context: Map::new(),
        }
    }

    /// Add a context value (later values overwrite earlier ones with the same key)
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

pub trait BaseEventLog: Send + Sync {
    /// Record a structured entry. Must not fail the caller.
    fn record(&self, entry: &LogEntry);
}
