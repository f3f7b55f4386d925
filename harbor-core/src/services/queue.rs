//! Queue service - offline write queue lifecycle

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::{QueueItem, QueueStatus, RETRY_CEILING};

/// Queue service driving the pending-operation lifecycle.
/// Enqueueing happens inside the store's atomic local-write paths; this
/// service owns batching, backoff eligibility, and result bookkeeping.
pub struct QueueService {
    store: Arc<DuckDbStore>,
}

impl QueueService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Deliverable items, oldest first: pending or retrying, outside their
    /// backoff window, below the retry ceiling. Terminal items never
    /// reappear here.
    pub fn next_batch(&self) -> Result<Vec<QueueItem>> {
        let now = Utc::now();
        let items = self.store.get_queue_items()?;
        Ok(items.into_iter().filter(|item| item.is_due(now)).collect())
    }

    /// Record a delivery outcome. Success deletes the item; failure bumps
    /// the retry bookkeeping and flips the item terminal at the ceiling.
    pub fn record_result(&self, item: &QueueItem, ok: bool) -> Result<()> {
        if ok {
            self.store.delete_queue_item(item.id)?;
            return Ok(());
        }

        let mut updated = item.clone();
        updated.retry_count += 1;
        updated.last_attempt_at = Some(Utc::now());
        updated.status = if updated.retry_count >= RETRY_CEILING {
            QueueStatus::Failed
        } else {
            QueueStatus::Retrying
        };
        self.store.update_queue_item(&updated)?;
        Ok(())
    }

    /// Full queue contents for operator inspection
    pub fn list(&self) -> Result<Vec<QueueItem>> {
        self.store.get_queue_items()
    }

    /// Debug escape hatch: drop everything, including failed items
    pub fn clear(&self) -> Result<ClearResult> {
        let deleted = self.store.clear_queue()?;
        Ok(ClearResult {
            deleted: deleted as i64,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub deleted: i64,
}
