//! Logging service - structured event logging
//!
//! Privacy-safe event log persisted in the main database. Events carry a
//! name, an optional resource, a counter, and an optional error message.
//! No user data (descriptions, amounts, account names) is ever logged.
//! Logging never fails the operation that emits it.

use std::sync::Arc;

use crate::adapters::duckdb::DuckDbStore;

/// A log event to be recorded
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub event: String,
    pub resource: Option<String>,
    pub count: i64,
    pub error_message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            resource: None,
            count: 1,
            error_message: None,
        }
    }

    /// Set the resource context (e.g. "transactions", "tags")
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the occurrence count
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// Set the error message
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }
}

/// Sync logger writing structured events to the store
pub struct SyncLogger {
    store: Arc<DuckDbStore>,
}

impl SyncLogger {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Record an event, swallowing storage errors: logging must never
    /// break the operation being logged.
    pub fn log(&self, event: LogEvent) {
        if let Err(e) = self.store.insert_event(
            &event.event,
            event.resource.as_deref(),
            event.count,
            event.error_message.as_deref(),
        ) {
            eprintln!("[harbor] failed to record event {}: {}", event.event, e);
        }
    }
}
