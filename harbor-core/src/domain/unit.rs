//! Unit and price domain models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradeable or denominating unit: a currency, a security, a commodity.
/// Upserted by natural code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub code: String,
    pub name: String,
    pub symbol: Option<String>,
    /// Free-form type: "currency", "stock", "fund", ...
    pub unit_type: Option<String>,
    /// True while local edits have not been acknowledged by the server
    pub dirty: bool,
}

impl Unit {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            symbol: None,
            unit_type: None,
            dirty: false,
        }
    }
}

/// A dated quote for a unit. Identity is the (unit_code, date) composite;
/// pulls overwrite by that key, point-in-time data needs no merge logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub unit_code: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub source: Option<String>,
}
