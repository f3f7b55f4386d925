//! Demo gateway - deterministic fixture data
//!
//! Implements the RemoteGateway port from in-memory fixtures so the app
//! can be exercised end to end without a server: a small chart of
//! accounts, a year of salary/rent/grocery activity, a brokerage position
//! with prices. Submissions always succeed and are kept for inspection,
//! which makes this the workhorse double for sync tests.

use std::sync::Mutex;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::domain::{Account, AccountCategory, Posting, Price, Tag, Transaction, Unit};
use crate::ports::{
    FetchResult, GatewayResult, RemoteGateway, SubmitOutcome, TransactionPage,
};

/// A submission recorded by the demo gateway
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub endpoint: String,
    pub method: String,
    pub payload: JsonValue,
}

/// Demo gateway serving deterministic fixtures
pub struct DemoGateway {
    tags: Vec<Tag>,
    accounts: Vec<Account>,
    units: Vec<Unit>,
    transactions: Vec<Transaction>,
    prices: Vec<Price>,
    submissions: Mutex<Vec<RecordedSubmission>>,
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoGateway {
    pub fn new() -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        Self {
            tags: demo_tags(),
            accounts: demo_accounts(),
            units: demo_units(),
            transactions: demo_transactions(start, 12),
            prices: demo_prices(start, 12),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Everything submitted through this gateway, in order
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

impl RemoteGateway for DemoGateway {
    fn list_tags(&self) -> GatewayResult<FetchResult<Tag>> {
        Ok(FetchResult {
            items: self.tags.clone(),
            skipped: 0,
        })
    }

    fn list_accounts(&self) -> GatewayResult<FetchResult<Account>> {
        Ok(FetchResult {
            items: self.accounts.clone(),
            skipped: 0,
        })
    }

    fn list_units(&self) -> GatewayResult<FetchResult<Unit>> {
        Ok(FetchResult {
            items: self.units.clone(),
            skipped: 0,
        })
    }

    fn list_transactions(&self, limit: i64, offset: i64) -> GatewayResult<TransactionPage> {
        let total = self.transactions.len() as i64;
        let start = offset.clamp(0, total) as usize;
        let end = (offset + limit).clamp(0, total) as usize;
        Ok(TransactionPage {
            items: self.transactions[start..end].to_vec(),
            total,
            skipped: 0,
        })
    }

    fn list_prices(&self) -> GatewayResult<FetchResult<Price>> {
        Ok(FetchResult {
            items: self.prices.clone(),
            skipped: 0,
        })
    }

    fn get_portfolio(&self) -> GatewayResult<JsonValue> {
        Ok(json!({
            "positions": [
                { "unitCode": "VTI", "quantity": "24", "value": "6480.00" }
            ]
        }))
    }

    fn get_net_worth_history(&self, interval: &str) -> GatewayResult<JsonValue> {
        Ok(json!({ "interval": interval, "points": [] }))
    }

    fn get_tax_analysis(&self) -> GatewayResult<JsonValue> {
        Ok(json!({ "estimatedLiability": "0.00" }))
    }

    fn get_capital_gains(&self, year: i32) -> GatewayResult<JsonValue> {
        Ok(json!({ "year": year, "realized": "0.00", "unrealized": "480.00" }))
    }

    fn get_cash_flow(&self, interval: &str) -> GatewayResult<JsonValue> {
        Ok(json!({ "interval": interval, "periods": [] }))
    }

    fn submit(
        &self,
        endpoint: &str,
        method: &str,
        payload: &JsonValue,
    ) -> GatewayResult<SubmitOutcome> {
        self.submissions.lock().unwrap().push(RecordedSubmission {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            payload: payload.clone(),
        });
        Ok(SubmitOutcome { success: true })
    }
}

// === Fixture builders ===

/// Stable UUID for fixture entity `n` of a namespace; keeps demo data
/// identical across syncs so the pull dedup path is exercised
fn fixture_id(namespace: u32, n: u32) -> Uuid {
    Uuid::from_u128(((namespace as u128) << 64) | n as u128)
}

fn demo_tags() -> Vec<Tag> {
    let mut groceries = Tag::new("groceries", "Groceries");
    groceries.color = Some("#4caf50".to_string());
    let mut rent = Tag::new("rent", "Rent");
    rent.color = Some("#f44336".to_string());
    let mut salary = Tag::new("salary", "Salary");
    salary.description = Some("Employment income".to_string());
    let investing = Tag::new("investing", "Investing");
    vec![groceries, rent, salary, investing]
}

fn demo_accounts() -> Vec<Account> {
    let mut checking = Account::new("Assets:Checking", "Checking", AccountCategory::Asset);
    checking.account_type = Some("Cash".to_string());

    let mut brokerage = Account::new("Assets:Brokerage", "Brokerage", AccountCategory::Asset);
    brokerage.account_type = Some("Investment".to_string());

    let mut card = Account::new(
        "Liabilities:CreditCard",
        "Credit Card",
        AccountCategory::Liability,
    );
    card.account_type = Some("CreditCard".to_string());

    let salary = Account::new("Income:Salary", "Salary", AccountCategory::Income);
    let food = Account::new("Expenses:Food", "Food", AccountCategory::Expense);
    let rent = Account::new("Expenses:Rent", "Rent", AccountCategory::Expense);
    let opening = Account::new("Equity:Opening", "Opening Balances", AccountCategory::Equity);

    vec![checking, brokerage, card, salary, food, rent, opening]
}

fn demo_units() -> Vec<Unit> {
    let mut usd = Unit::new("USD", "US Dollar");
    usd.symbol = Some("$".to_string());
    usd.unit_type = Some("currency".to_string());

    let mut vti = Unit::new("VTI", "Total Market Index");
    vti.unit_type = Some("stock".to_string());

    vec![usd, vti]
}

/// One year of activity: monthly salary, rent, two grocery runs, and a
/// quarterly brokerage purchase. Every transaction balances.
fn demo_transactions(start: NaiveDate, months: u32) -> Vec<Transaction> {
    let mut txs = Vec::new();
    let mut n = 0u32;

    let mut push = |date: NaiveDate, description: &str, postings: Vec<Posting>| {
        n += 1;
        let mut tx = Transaction::new(fixture_id(1, n), date, description);
        tx.postings = postings;
        txs.push(tx);
    };

    for m in 0..months {
        let month_start = start
            .checked_add_months(Months::new(m))
            .unwrap_or(start);

        let mut salary_in = Posting::new("Assets:Checking", Decimal::new(4_200_00, 2));
        salary_in.tag_ids = vec!["salary".to_string()];
        push(
            month_start,
            "Salary",
            vec![
                salary_in,
                Posting::new("Income:Salary", Decimal::new(-4_200_00, 2)),
            ],
        );

        let mut rent_out = Posting::new("Expenses:Rent", Decimal::new(1_450_00, 2));
        rent_out.tag_ids = vec!["rent".to_string()];
        push(
            month_start + chrono::Duration::days(2),
            "Rent",
            vec![
                rent_out,
                Posting::new("Assets:Checking", Decimal::new(-1_450_00, 2)),
            ],
        );

        for week in 0..2u32 {
            let amount = Decimal::new(85_00 + (m as i64 * 7 + week as i64) * 100, 2);
            let mut food = Posting::new("Expenses:Food", amount);
            food.tag_ids = vec!["groceries".to_string()];
            push(
                month_start + chrono::Duration::days(5 + week as i64 * 14),
                "Groceries",
                vec![food, Posting::new("Assets:Checking", -amount)],
            );
        }

        if m % 3 == 0 {
            let mut buy = Posting::new("Assets:Brokerage", Decimal::new(1_500_00, 2));
            buy.quantity = Decimal::new(6, 0);
            buy.unit_code = Some("VTI".to_string());
            buy.tag_ids = vec!["investing".to_string()];
            push(
                month_start + chrono::Duration::days(10),
                "Buy VTI",
                vec![buy, Posting::new("Assets:Checking", Decimal::new(-1_500_00, 2))],
            );
        }
    }

    txs
}

/// Monthly VTI quotes drifting gently upward
fn demo_prices(start: NaiveDate, months: u32) -> Vec<Price> {
    (0..months)
        .map(|m| Price {
            unit_code: "VTI".to_string(),
            date: start
                .checked_add_months(Months::new(m))
                .unwrap_or(start),
            price: Decimal::new(250_00 + m as i64 * 4_50, 2),
            currency: "USD".to_string(),
            source: Some("demo".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_transactions_balance() {
        let gw = DemoGateway::new();
        for tx in &gw.transactions {
            assert!(tx.validate().is_ok(), "fixture {} must balance", tx.description);
        }
    }

    #[test]
    fn test_fixture_ids_stable_across_instances() {
        let a = DemoGateway::new();
        let b = DemoGateway::new();
        let ids_a: Vec<Uuid> = a.transactions.iter().map(|t| t.id).collect();
        let ids_b: Vec<Uuid> = b.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_pagination_walks_to_exhaustion() {
        let gw = DemoGateway::new();
        let total = gw.transactions.len();

        let mut seen = 0usize;
        let mut offset = 0i64;
        loop {
            let page = gw.list_transactions(10, offset).unwrap();
            seen += page.items.len();
            offset += page.items.len() as i64;
            if page.items.len() < 10 {
                break;
            }
        }
        assert_eq!(seen, total);
    }
}
