//! Status service - store and queue summaries

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::QueueStatus;

/// Status service for local store summaries
pub struct StatusService {
    store: Arc<DuckDbStore>,
}

impl StatusService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let depths = self.store.queue_depth_by_status()?;

        Ok(StatusSummary {
            total_accounts: self.store.count_accounts()?,
            total_transactions: self.store.count_transactions()?,
            total_tags: self.store.count_tags()?,
            total_units: self.store.count_units()?,
            total_prices: self.store.count_prices()?,
            queue_pending: depths.get(&QueueStatus::Pending).copied().unwrap_or(0),
            queue_retrying: depths.get(&QueueStatus::Retrying).copied().unwrap_or(0),
            queue_failed: depths.get(&QueueStatus::Failed).copied().unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_accounts: i64,
    pub total_transactions: i64,
    pub total_tags: i64,
    pub total_units: i64,
    pub total_prices: i64,
    pub queue_pending: i64,
    pub queue_retrying: i64,
    pub queue_failed: i64,
}
