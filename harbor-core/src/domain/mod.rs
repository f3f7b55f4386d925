//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod queue;
mod report;
mod tag;
mod transaction;
mod unit;
pub mod result;

pub use account::{Account, AccountCategory, MetaValue};
pub use queue::{backoff_delay, QueueItem, QueueStatus, RETRY_CEILING};
pub use report::{ReportKind, ReportSnapshot};
pub use tag::Tag;
pub use transaction::{Posting, Transaction, BALANCE_TOLERANCE};
pub use unit::{Price, Unit};
