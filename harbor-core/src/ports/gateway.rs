//! Remote gateway port
//!
//! Defines the interface the sync orchestrator uses to reach the
//! authoritative server. Implementations (HTTP, demo fixtures) decode
//! records individually: a malformed record is dropped and counted, never
//! fatal to its batch.

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::{Account, Price, Tag, Transaction, Unit};

/// Gateway error taxonomy. Transport errors drive queue backoff,
/// `Unauthorized` triggers global de-authentication, everything else is
/// recorded against the current sync cycle.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("server error: {0}")]
    Remote(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// A decoded batch of records. `skipped` counts remote records that failed
/// to decode and were dropped.
#[derive(Debug)]
pub struct FetchResult<T> {
    pub items: Vec<T>,
    pub skipped: u32,
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

/// One page of the paginated transaction listing
#[derive(Debug, Default)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Total transactions on the server, across all pages
    pub total: i64,
    pub skipped: u32,
}

/// Outcome of submitting a queued write
#[derive(Debug)]
pub struct SubmitOutcome {
    pub success: bool,
}

/// Remote gateway trait
///
/// The sync orchestrator pulls canonical state and pushes queued writes
/// through this trait without knowing the transport. Screens never call
/// it directly; they read from the local store only.
pub trait RemoteGateway: Send + Sync {
    fn list_tags(&self) -> GatewayResult<FetchResult<Tag>>;

    fn list_accounts(&self) -> GatewayResult<FetchResult<Account>>;

    fn list_units(&self) -> GatewayResult<FetchResult<Unit>>;

    /// Fetch one page of transactions with limit/offset; the caller pages
    /// to exhaustion (a short or empty page ends the walk)
    fn list_transactions(&self, limit: i64, offset: i64) -> GatewayResult<TransactionPage>;

    fn list_prices(&self) -> GatewayResult<FetchResult<Price>>;

    // Point-in-time report payloads, cached last-write-wins locally

    fn get_portfolio(&self) -> GatewayResult<JsonValue>;

    fn get_net_worth_history(&self, interval: &str) -> GatewayResult<JsonValue>;

    fn get_tax_analysis(&self) -> GatewayResult<JsonValue>;

    fn get_capital_gains(&self, year: i32) -> GatewayResult<JsonValue>;

    fn get_cash_flow(&self, interval: &str) -> GatewayResult<JsonValue>;

    /// Submit a queued local write to the server
    fn submit(&self, endpoint: &str, method: &str, payload: &JsonValue)
        -> GatewayResult<SubmitOutcome>;
}

/// Authentication collaborator, injected rather than read from globals.
/// `deauthenticate` is the side effect of a 401 from the gateway.
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn deauthenticate(&self);
}

/// Connectivity collaborator: a single boolean signal.
/// Reachability detection itself lives outside the core.
pub trait ConnectivityProvider: Send + Sync {
    fn is_online(&self) -> bool;
}
