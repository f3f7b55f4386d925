//! Transaction and posting domain models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// Tolerance for the double-entry balance check
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// One signed line of a double-entry transaction, attributing an amount
/// to a single account. Owned exclusively by its transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: Uuid,
    /// Account path, resolved at read time (not enforced by storage)
    pub account_path: String,
    /// Signed amount in the transaction currency
    pub amount: Decimal,
    /// Quantity of the unit moved (shares, grams, ...); equals amount for cash
    pub quantity: Decimal,
    pub unit_code: Option<String>,
    /// Weak references to tags; the posting does not own tag lifetime
    pub tag_ids: Vec<String>,
}

impl Posting {
    pub fn new(account_path: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_path: account_path.into(),
            amount,
            quantity: amount,
            unit_code: None,
            tag_ids: Vec::new(),
        }
    }
}

/// A ledger transaction: immutable in spirit once observed from the
/// remote. The `dirty` flag marks local edits the server has not yet
/// acknowledged; pull-upsert must never overwrite a transaction body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub note: Option<String>,
    /// Ordered postings, owned by this transaction
    pub postings: Vec<Posting>,
    /// True while local edits have not been acknowledged by the server
    pub dirty: bool,
    /// Soft delete marker
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(id: Uuid, date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id,
            date,
            description: description.into(),
            note: None,
            postings: Vec::new(),
            dirty: false,
            deleted: false,
            updated_at: Utc::now(),
        }
    }

    /// Sum of all posting amounts
    pub fn balance(&self) -> Decimal {
        self.postings.iter().map(|p| p.amount).sum()
    }

    /// Validate the double-entry invariant: postings present and their
    /// signed amounts summing to zero within tolerance. Enforced at write
    /// time by the caller, not by storage.
    pub fn validate(&self) -> Result<()> {
        if self.postings.is_empty() {
            return Err(Error::validation(format!(
                "transaction {} has no postings",
                self.id
            )));
        }
        let balance = self.balance();
        if balance.abs() > BALANCE_TOLERANCE {
            return Err(Error::validation(format!(
                "transaction {} does not balance: posting sum {}",
                self.id, balance
            )));
        }
        Ok(())
    }

    /// Normalize tag ids: deduplicate, trim whitespace, remove empty
    pub fn normalize_tags(tags: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();

        for tag in tags {
            let trimmed = tag.trim().to_string();
            if !trimmed.is_empty() && seen.insert(trimmed.clone()) {
                result.push(trimmed);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_tx() -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            "Groceries",
        );
        tx.postings.push(Posting::new("Expenses:Food", Decimal::new(4250, 2)));
        tx.postings
            .push(Posting::new("Assets:Checking", Decimal::new(-4250, 2)));
        tx
    }

    #[test]
    fn test_balanced_transaction_validates() {
        assert!(balanced_tx().validate().is_ok());
    }

    #[test]
    fn test_unbalanced_transaction_rejected() {
        let mut tx = balanced_tx();
        tx.postings[0].amount = Decimal::new(4300, 2);
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_balance_within_tolerance_accepted() {
        let mut tx = balanced_tx();
        // Off by exactly one cent: still within the 0.01 tolerance
        tx.postings[0].amount = Decimal::new(4251, 2);
        assert!(tx.validate().is_ok());

        // Off by two cents: rejected
        tx.postings[0].amount = Decimal::new(4252, 2);
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_empty_postings_rejected() {
        let tx = Transaction::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            "Empty",
        );
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_tag_normalization() {
        let tags = vec![
            "food".to_string(),
            "  groceries ".to_string(),
            "food".to_string(), // duplicate
            "".to_string(),     // empty
        ];
        let normalized = Transaction::normalize_tags(&tags);
        assert_eq!(normalized, vec!["food", "groceries"]);
    }
}
