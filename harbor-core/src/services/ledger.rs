//! Ledger service - locally-authored mutations
//!
//! The write path for edit forms: validates the entity, marks it dirty,
//! and hands it to the store together with its outbound queue item so the
//! entity write and the enqueue commit as one unit.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::{Account, QueueItem, Tag, Transaction, Unit};
use crate::services::AnalyticsService;

/// Ledger service for local mutations
pub struct LedgerService {
    store: Arc<DuckDbStore>,
    analytics: Arc<AnalyticsService>,
}

impl LedgerService {
    pub fn new(store: Arc<DuckDbStore>, analytics: Arc<AnalyticsService>) -> Self {
        Self { store, analytics }
    }

    /// Record a new transaction authored on this device. The double-entry
    /// balance invariant is enforced here, before anything is stored.
    pub fn create_transaction(&self, mut tx: Transaction) -> Result<()> {
        tx.validate()?;
        for posting in &mut tx.postings {
            posting.tag_ids = Transaction::normalize_tags(&posting.tag_ids);
        }
        tx.dirty = true;

        let payload = serde_json::to_value(&tx).context("serialize transaction payload")?;
        let item = QueueItem::new("transaction.create", "/transactions", "POST", payload);
        self.store.create_transaction_local(&tx, &item)?;
        self.analytics.invalidate();
        Ok(())
    }

    /// Soft-delete a transaction locally and queue the server-side delete
    pub fn delete_transaction(&self, id: Uuid) -> Result<()> {
        let item = QueueItem::new(
            "transaction.delete",
            format!("/transactions/{}", id),
            "DELETE",
            json!({ "id": id }),
        );
        self.store.delete_transaction_local(id, &item)?;
        self.analytics.invalidate();
        Ok(())
    }

    /// Create or edit an account locally
    pub fn save_account(&self, mut account: Account) -> Result<()> {
        account.validate()?;
        account.currency = Account::normalize_currency(&account.currency);
        account.dirty = true;

        let payload = serde_json::to_value(&account).context("serialize account payload")?;
        let item = QueueItem::new("account.upsert", "/accounts", "PUT", payload);
        self.store.save_account_local(&account, &item)?;
        self.analytics.invalidate();
        Ok(())
    }

    /// Create or edit a tag locally
    pub fn save_tag(&self, mut tag: Tag) -> Result<()> {
        tag.dirty = true;
        let payload = serde_json::to_value(&tag).context("serialize tag payload")?;
        let item = QueueItem::new("tag.upsert", "/tags", "PUT", payload);
        self.store.save_tag_local(&tag, &item)?;
        Ok(())
    }

    /// Create or edit a unit locally
    pub fn save_unit(&self, mut unit: Unit) -> Result<()> {
        unit.dirty = true;
        let payload = serde_json::to_value(&unit).context("serialize unit payload")?;
        let item = QueueItem::new("unit.upsert", "/units", "PUT", payload);
        self.store.save_unit_local(&unit, &item)?;
        Ok(())
    }
}
