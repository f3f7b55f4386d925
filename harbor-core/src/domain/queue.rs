//! Offline write queue domain model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Retry ceiling: an item that has failed this many times is terminal
pub const RETRY_CEILING: u32 = 10;

/// Base backoff delay in seconds (doubles each retry)
const BASE_BACKOFF_SECS: i64 = 30;

/// Backoff cap in seconds
const MAX_BACKOFF_SECS: i64 = 3600;

/// Delivery state of a queued operation.
/// `pending -> retrying <-> retrying -> failed (terminal)`;
/// any state is deleted outright on confirmed server success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Retrying,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Retrying => "retrying",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "retrying" => QueueStatus::Retrying,
            "failed" => QueueStatus::Failed,
            _ => QueueStatus::Pending,
        }
    }
}

/// Backoff window for an item with the given retry count:
/// `30 * 2^n` seconds, capped at one hour. Monotone in retry count so
/// repeated failures space out attempts automatically.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let exp = retry_count.min(30); // avoid shift overflow; cap dominates anyway
    let secs = BASE_BACKOFF_SECS.saturating_mul(1i64 << exp);
    Duration::seconds(secs.min(MAX_BACKOFF_SECS))
}

/// A locally-authored mutation awaiting delivery to the server.
/// Created in the same storage transaction as the entity write it mirrors,
/// deleted on confirmed success, retained as `failed` for operator
/// visibility once the retry ceiling is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    /// Operation kind, e.g. "transaction.create", "account.update"
    pub operation: String,
    /// Server endpoint the payload is submitted to
    pub endpoint: String,
    /// HTTP-style method: "POST", "PUT", ...
    pub method: String,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub status: QueueStatus,
}

impl QueueItem {
    pub fn new(
        operation: impl Into<String>,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.into(),
            endpoint: endpoint.into(),
            method: method.into(),
            payload,
            created_at: Utc::now(),
            last_attempt_at: None,
            retry_count: 0,
            status: QueueStatus::Pending,
        }
    }

    /// Whether the item is eligible for delivery at `now`: not terminal
    /// and outside the backoff window measured from its last attempt.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.status == QueueStatus::Failed || self.retry_count >= RETRY_CEILING {
            return false;
        }
        match self.last_attempt_at {
            None => true,
            Some(last) => now >= last + backoff_delay(self.retry_count),
        }
    }
}
