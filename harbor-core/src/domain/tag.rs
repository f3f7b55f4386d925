//! Tag domain model

use serde::{Deserialize, Serialize};

/// A categorization label applied to postings.
/// Upserted by natural id; last write wins on the mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    /// True while local edits have not been acknowledged by the server
    pub dirty: bool,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            color: None,
            dirty: false,
        }
    }
}
