//! Report snapshot domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of server-computed report held in the keyed side cache.
/// These are point-in-time snapshots, overwritten last-write-wins on pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Portfolio,
    NetWorthHistory,
    TaxAnalysis,
    CapitalGains,
    CashFlow,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Portfolio => "portfolio",
            ReportKind::NetWorthHistory => "net_worth_history",
            ReportKind::TaxAnalysis => "tax_analysis",
            ReportKind::CapitalGains => "capital_gains",
            ReportKind::CashFlow => "cash_flow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "portfolio" => Some(ReportKind::Portfolio),
            "net_worth_history" => Some(ReportKind::NetWorthHistory),
            "tax_analysis" => Some(ReportKind::TaxAnalysis),
            "capital_gains" => Some(ReportKind::CapitalGains),
            "cash_flow" => Some(ReportKind::CashFlow),
            _ => None,
        }
    }
}

/// One cached report payload, keyed by (kind, key). The key carries the
/// report parameter ("2025" for capital gains of a year, "monthly" for an
/// interval) or is empty for parameterless reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub kind: ReportKind,
    pub key: String,
    pub payload: JsonValue,
    pub fetched_at: DateTime<Utc>,
}

impl ReportSnapshot {
    pub fn new(kind: ReportKind, key: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            kind,
            key: key.into(),
            payload,
            fetched_at: Utc::now(),
        }
    }
}
