//! Account domain model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Balance-sheet category of an account.
/// Determines how posting amounts affect net worth and how transactions
/// touching the account are classified for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    Asset,
    Liability,
    Income,
    Expense,
    Equity,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Asset => "asset",
            AccountCategory::Liability => "liability",
            AccountCategory::Income => "income",
            AccountCategory::Expense => "expense",
            AccountCategory::Equity => "equity",
        }
    }

    /// Parse a category from its storage string, defaulting unknowns to Asset
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "liability" => AccountCategory::Liability,
            "income" => AccountCategory::Income,
            "expense" => AccountCategory::Expense,
            "equity" => AccountCategory::Equity,
            _ => AccountCategory::Asset,
        }
    }
}

/// Typed metadata value for the account extras map.
/// Replaces an arbitrary JSON blob with a small tagged union so extra
/// fields (credit-card limit, portfolio snapshot hints) stay queryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

/// A ledger account, identified by its hierarchical path
/// (e.g. `Assets:Checking:Everyday`). Paths are unique and never deleted;
/// remote and local edits converge through upsert-by-path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Hierarchical path, the natural key
    pub path: String,
    pub name: String,
    pub category: AccountCategory,
    /// Free-form type: "Cash", "Investment", "CreditCard", ...
    pub account_type: Option<String>,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: String,
    pub parent_path: Option<String>,
    pub metadata: BTreeMap<String, MetaValue>,
    /// Cached annualized return for investment accounts
    pub cached_xirr: Option<f64>,
    /// Staleness marker for the cached metric
    pub xirr_computed_at: Option<DateTime<Utc>>,
    /// True while local edits have not been acknowledged by the server
    pub dirty: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with required fields
    pub fn new(path: impl Into<String>, name: impl Into<String>, category: AccountCategory) -> Self {
        let path = path.into();
        let now = Utc::now();
        Self {
            parent_path: Self::parent_of(&path),
            path,
            name: name.into(),
            category,
            account_type: None,
            currency: "USD".to_string(),
            metadata: BTreeMap::new(),
            cached_xirr: None,
            xirr_computed_at: None,
            dirty: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive the parent path from a hierarchical path.
    /// `Assets:Checking:Everyday` -> `Assets:Checking`; top-level paths have none.
    pub fn parent_of(path: &str) -> Option<String> {
        path.rsplit_once(':').map(|(parent, _)| parent.to_string())
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }

    /// Validate account data
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::validation("account path cannot be empty"));
        }
        if self.path.split(':').any(|seg| seg.trim().is_empty()) {
            return Err(Error::validation(format!(
                "account path has empty segment: {}",
                self.path
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(Error::validation("currency cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_path_derivation() {
        assert_eq!(
            Account::parent_of("Assets:Checking:Everyday"),
            Some("Assets:Checking".to_string())
        );
        assert_eq!(Account::parent_of("Assets"), None);
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(Account::normalize_currency("usd"), "USD");
        assert_eq!(Account::normalize_currency(" eur "), "EUR");
    }

    #[test]
    fn test_account_validation() {
        let mut account = Account::new("Assets:Checking", "Checking", AccountCategory::Asset);
        assert!(account.validate().is_ok());

        account.path = "Assets::Checking".to_string();
        assert!(account.validate().is_err());

        account.path = "".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_category_roundtrip() {
        for cat in [
            AccountCategory::Asset,
            AccountCategory::Liability,
            AccountCategory::Income,
            AccountCategory::Expense,
            AccountCategory::Equity,
        ] {
            assert_eq!(AccountCategory::parse(cat.as_str()), cat);
        }
        assert_eq!(AccountCategory::parse("unknown"), AccountCategory::Asset);
    }

    #[test]
    fn test_metadata_value_json_shapes() {
        let json = r#"{"creditLimit": 5000.0, "shared": true, "issuer": "Acme", "closed": null}"#;
        let map: BTreeMap<String, MetaValue> = serde_json::from_str(json).unwrap();
        assert_eq!(map["creditLimit"], MetaValue::Num(5000.0));
        assert_eq!(map["shared"], MetaValue::Bool(true));
        assert_eq!(map["issuer"], MetaValue::Str("Acme".to_string()));
        assert_eq!(map["closed"], MetaValue::Null);
    }
}
