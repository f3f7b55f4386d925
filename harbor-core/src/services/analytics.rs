//! Analytics service - dashboard projections over the local store
//!
//! Summary and trend queries scan the full transaction history repeatedly,
//! so classification and numeric parsing happen once per transaction when
//! the projection is built. The projection is cached for a short TTL and
//! invalidated by writes; the tag breakdown is computed uncached since it
//! is called far less often.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::AccountCategory;
use crate::services::xirr;

/// Projection cache lifetime
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Tags listed individually in the breakdown; the rest roll into "Others"
const BREAKDOWN_TOP_N: usize = 9;

/// Runway ceiling in days
const MAX_RUNWAY_DAYS: f64 = 9999.0;

/// Classified flow direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Income,
    Expense,
    Transfer,
}

/// Per-transaction projection: everything the summary and chart queries
/// need, parsed and classified exactly once
#[derive(Debug, Clone, Serialize)]
pub struct TransactionProjection {
    pub date: NaiveDate,
    pub kind: FlowKind,
    pub display_amount: Decimal,
    /// Net signed effect on asset accounts
    pub asset_impact: Decimal,
    /// Net signed effect on liability accounts (negative when owing more)
    pub liability_impact: Decimal,
}

/// Inclusive date range for analytics queries
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

struct CachedProjection {
    built_at: Instant,
    rows: Arc<Vec<TransactionProjection>>,
}

/// Analytics service over the local store
pub struct AnalyticsService {
    store: Arc<DuckDbStore>,
    /// First month of the fiscal year (1-12); April by default
    fiscal_year_start_month: u32,
    cache: Mutex<Option<CachedProjection>>,
}

impl AnalyticsService {
    pub fn new(store: Arc<DuckDbStore>, fiscal_year_start_month: u32) -> Self {
        Self {
            store,
            fiscal_year_start_month: fiscal_year_start_month.clamp(1, 12),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached projection; the next query rebuilds it
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// The cached immutable projection, rebuilt when absent or expired
    pub fn projection(&self) -> Result<Arc<Vec<TransactionProjection>>> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(cached) = cache.as_ref() {
            if cached.built_at.elapsed() < CACHE_TTL {
                return Ok(Arc::clone(&cached.rows));
            }
        }

        let rows = Arc::new(self.build_projection()?);
        *cache = Some(CachedProjection {
            built_at: Instant::now(),
            rows: Arc::clone(&rows),
        });
        Ok(rows)
    }

    fn build_projection(&self) -> Result<Vec<TransactionProjection>> {
        let categories: HashMap<String, AccountCategory> = self
            .store
            .get_accounts()?
            .into_iter()
            .map(|a| (a.path, a.category))
            .collect();

        let transactions = self.store.get_transactions()?;
        let mut rows = Vec::with_capacity(transactions.len());

        for tx in &transactions {
            let mut asset_impact = Decimal::ZERO;
            let mut liability_impact = Decimal::ZERO;
            let mut income_side = Decimal::ZERO;
            let mut expense_side = Decimal::ZERO;
            let mut positive_moved = Decimal::ZERO;

            for posting in &tx.postings {
                // Unresolvable account paths contribute nothing; the FK is
                // resolved at read time, not enforced by storage
                let category = categories.get(&posting.account_path).copied();
                match category {
                    Some(AccountCategory::Asset) => asset_impact += posting.amount,
                    Some(AccountCategory::Liability) => liability_impact += posting.amount,
                    Some(AccountCategory::Income) => income_side += posting.amount.abs(),
                    Some(AccountCategory::Expense) => expense_side += posting.amount,
                    _ => {}
                }
                if posting.amount > Decimal::ZERO {
                    positive_moved += posting.amount;
                }
            }

            let (kind, display_amount) = if income_side > Decimal::ZERO {
                (FlowKind::Income, income_side)
            } else if expense_side != Decimal::ZERO {
                (FlowKind::Expense, expense_side.abs())
            } else {
                (FlowKind::Transfer, positive_moved)
            };

            rows.push(TransactionProjection {
                date: tx.date,
                kind,
                display_amount,
                asset_impact,
                liability_impact,
            });
        }

        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    // === Summary ===

    /// Income/expense totals, net worth, savings rate, fiscal-YTD totals,
    /// month-over-month deltas, and the dashboard KPIs for one range
    pub fn summary(&self, range: DateRange) -> Result<Summary> {
        let rows = self.projection()?;

        let (income, expense) = totals(&rows, range);

        let fiscal_start = self.fiscal_year_start(range.end);
        let (fiscal_income, fiscal_expense) =
            totals(&rows, DateRange::new(fiscal_start, range.end));

        // Net worth as of the range end
        let mut assets = Decimal::ZERO;
        let mut liabilities = Decimal::ZERO;
        for row in rows.iter().filter(|r| r.date <= range.end) {
            assets += row.asset_impact;
            liabilities += row.liability_impact;
        }
        let net_worth = assets + liabilities;

        let savings_rate = if income > Decimal::ZERO {
            ((income - expense) / income).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        // Trailing 30 days vs the 30 days before them, anchored at range end
        let trailing = DateRange::new(range.end - chrono::Duration::days(29), range.end);
        let preceding = DateRange::new(
            range.end - chrono::Duration::days(59),
            range.end - chrono::Duration::days(30),
        );
        let (trailing_income, trailing_expense) = totals(&rows, trailing);
        let (preceding_income, preceding_expense) = totals(&rows, preceding);

        // KPIs
        let cash_flow_ratio = if expense > Decimal::ZERO {
            (income / expense).to_f64().unwrap_or(0.0)
        } else if income > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };

        let burn_start = range
            .end
            .checked_sub_months(Months::new(6))
            .unwrap_or(range.end);
        let (_, burn_expense) = totals(&rows, DateRange::new(burn_start, range.end));
        let monthly_burn = burn_expense / Decimal::from(6);

        let daily_burn = monthly_burn / Decimal::from(30);
        let runway_days = if daily_burn > Decimal::ZERO && assets > Decimal::ZERO {
            (assets / daily_burn).to_f64().unwrap_or(0.0).min(MAX_RUNWAY_DAYS)
        } else if assets > Decimal::ZERO {
            MAX_RUNWAY_DAYS
        } else {
            0.0
        };

        let debt_to_asset_pct = if assets > Decimal::ZERO {
            (liabilities.abs() / assets * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(Summary {
            income,
            expense,
            net_worth,
            savings_rate,
            fiscal_ytd_income: fiscal_income,
            fiscal_ytd_expense: fiscal_expense,
            mom_income_delta: trailing_income - preceding_income,
            mom_expense_delta: trailing_expense - preceding_expense,
            cash_flow_ratio,
            monthly_burn,
            runway_days,
            debt_to_asset_pct,
        })
    }

    /// Start of the fiscal year containing `date`
    fn fiscal_year_start(&self, date: NaiveDate) -> NaiveDate {
        let year = if date.month() >= self.fiscal_year_start_month {
            date.year()
        } else {
            date.year() - 1
        };
        NaiveDate::from_ymd_opt(year, self.fiscal_year_start_month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).unwrap())
    }

    // === Net worth history ===

    /// Chronological walk of the projection: one baseline point carrying
    /// everything before the range start, then one point per calendar
    /// month, timestamped at that month's last transaction date.
    pub fn net_worth_history(&self, range: DateRange) -> Result<Vec<NetWorthPoint>> {
        let rows = self.projection()?;

        let mut running = Decimal::ZERO;
        for row in rows.iter().filter(|r| r.date < range.start) {
            running += row.asset_impact + row.liability_impact;
        }

        let mut points = vec![NetWorthPoint {
            date: range.start,
            total: running,
        }];

        let mut current_month: Option<(i32, u32)> = None;
        for row in rows.iter().filter(|r| range.contains(r.date)) {
            let month = (row.date.year(), row.date.month());
            running += row.asset_impact + row.liability_impact;

            if current_month == Some(month) {
                // Same month: move the point to this later transaction
                if let Some(last) = points.last_mut() {
                    last.date = row.date;
                    last.total = running;
                }
            } else {
                current_month = Some(month);
                points.push(NetWorthPoint {
                    date: row.date,
                    total: running,
                });
            }
        }

        Ok(points)
    }

    // === Tag breakdown ===

    /// Expense totals per tag, largest first: the top entries listed
    /// individually, the remainder rolled into one "Others" bucket.
    /// Uncached by design; this is called far less often than the summary.
    pub fn tag_breakdown(&self, range: DateRange) -> Result<Vec<TagBreakdownEntry>> {
        let categories: HashMap<String, AccountCategory> = self
            .store
            .get_accounts()?
            .into_iter()
            .map(|a| (a.path, a.category))
            .collect();
        let tag_names: HashMap<String, String> = self
            .store
            .get_tags()?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let mut totals: HashMap<String, Decimal> = HashMap::new();
        for tx in self.store.get_transactions()? {
            if !range.contains(tx.date) {
                continue;
            }
            for posting in &tx.postings {
                let is_expense = categories.get(&posting.account_path).copied()
                    == Some(AccountCategory::Expense);
                if !is_expense {
                    continue;
                }
                for tag_id in &posting.tag_ids {
                    *totals.entry(tag_id.clone()).or_insert(Decimal::ZERO) +=
                        posting.amount.abs();
                }
            }
        }

        let mut entries: Vec<TagBreakdownEntry> = totals
            .into_iter()
            .map(|(tag_id, total)| TagBreakdownEntry {
                name: tag_names.get(&tag_id).cloned().unwrap_or_else(|| tag_id.clone()),
                tag_id: Some(tag_id),
                total,
            })
            .collect();
        entries.sort_by(|a, b| b.total.cmp(&a.total));

        if entries.len() > BREAKDOWN_TOP_N {
            let rest = entries.split_off(BREAKDOWN_TOP_N);
            let others_total: Decimal = rest.iter().map(|e| e.total).sum();
            entries.push(TagBreakdownEntry {
                tag_id: None,
                name: "Others".to_string(),
                total: others_total,
            });
        }

        Ok(entries)
    }

    // === Investment return ===

    /// Recompute the annualized return of one account from its posting
    /// history plus a synthetic terminal flow at the position's current
    /// mark-to-market value, and cache the result on the account.
    pub fn refresh_account_xirr(&self, path: &str) -> Result<Option<f64>> {
        let account = self
            .store
            .get_account(path)?
            .ok_or_else(|| anyhow!("Account not found: {}", path))?;

        let latest_prices = self.store.get_latest_prices()?;

        let mut flows: Vec<(NaiveDate, f64)> = Vec::new();
        let mut holdings: HashMap<String, Decimal> = HashMap::new();
        let mut cash_position = Decimal::ZERO;

        for tx in self.store.get_transactions()? {
            for posting in tx.postings.iter().filter(|p| p.account_path == account.path) {
                // Money flowing into the position is an outflow for the investor
                flows.push((tx.date, -dec_f64(posting.amount)));
                match &posting.unit_code {
                    Some(code) => *holdings.entry(code.clone()).or_insert(Decimal::ZERO) +=
                        posting.quantity,
                    None => cash_position += posting.amount,
                }
            }
        }

        // Terminal flow: what the position is worth right now
        let mut current_value = cash_position;
        for (code, quantity) in &holdings {
            if let Some(price) = latest_prices.get(code) {
                current_value += *quantity * price.price;
            }
        }
        if current_value != Decimal::ZERO {
            flows.push((Utc::now().date_naive(), dec_f64(current_value)));
        }

        let rate = xirr::solve(&flows);
        self.store.update_account_xirr(path, rate)?;
        Ok(rate)
    }
}

/// Income and expense display totals within a range
fn totals(rows: &[TransactionProjection], range: DateRange) -> (Decimal, Decimal) {
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for row in rows.iter().filter(|r| range.contains(r.date)) {
        match row.kind {
            FlowKind::Income => income += row.display_amount,
            FlowKind::Expense => expense += row.display_amount,
            FlowKind::Transfer => {}
        }
    }
    (income, expense)
}

fn dec_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

// === Result types ===

#[derive(Debug, Serialize)]
pub struct Summary {
    pub income: Decimal,
    pub expense: Decimal,
    pub net_worth: Decimal,
    pub savings_rate: f64,
    pub fiscal_ytd_income: Decimal,
    pub fiscal_ytd_expense: Decimal,
    pub mom_income_delta: Decimal,
    pub mom_expense_delta: Decimal,
    /// income / expense; +inf when expense is zero but income is not
    pub cash_flow_ratio: f64,
    /// Trailing six months of expense, averaged per month
    pub monthly_burn: Decimal,
    pub runway_days: f64,
    pub debt_to_asset_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetWorthPoint {
    pub date: NaiveDate,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TagBreakdownEntry {
    /// None for the aggregated "Others" bucket
    pub tag_id: Option<String>,
    pub name: String,
    pub total: Decimal,
}
