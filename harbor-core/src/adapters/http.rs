//! HTTP gateway - remote server client
//!
//! Implements the RemoteGateway port over the ledger server's JSON API.
//! Records are decoded one by one: a malformed record is dropped and
//! counted rather than failing its whole batch. Transport and status
//! errors are mapped into the gateway error taxonomy; authentication
//! failures surface as Unauthorized so the orchestrator can de-auth.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::blocking::Client;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::{Account, AccountCategory, MetaValue, Posting, Price, Tag, Transaction, Unit};
use crate::ports::{
    FetchResult, GatewayError, GatewayResult, RemoteGateway, SubmitOutcome, TransactionPage,
};

/// Request timeout for all gateway calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP gateway over the remote ledger API
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpGateway {
    /// Create a gateway against a server base URL with a bearer token
    pub fn new(base_url: &str, token: &str) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn get_json(&self, path: &str) -> GatewayResult<JsonValue> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(map_request_error)?;

        check_response_status(&response)?;

        response
            .json()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Fetch an array endpoint and decode records individually
    fn fetch_records<T, D: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        map: impl Fn(D) -> Option<T>,
    ) -> GatewayResult<FetchResult<T>> {
        let body = self.get_json(path)?;
        let records = body
            .as_array()
            .cloned()
            .ok_or_else(|| GatewayError::Decode(format!("{}: expected array", path)))?;

        let mut result = FetchResult::default();
        for record in records {
            match serde_json::from_value::<D>(record).ok().and_then(&map) {
                Some(item) => result.items.push(item),
                None => result.skipped += 1,
            }
        }
        Ok(result)
    }
}

impl RemoteGateway for HttpGateway {
    fn list_tags(&self) -> GatewayResult<FetchResult<Tag>> {
        self.fetch_records("/tags", |dto: RemoteTag| Some(dto.into_domain()))
    }

    fn list_accounts(&self) -> GatewayResult<FetchResult<Account>> {
        self.fetch_records("/accounts", RemoteAccount::into_domain)
    }

    fn list_units(&self) -> GatewayResult<FetchResult<Unit>> {
        self.fetch_records("/units", |dto: RemoteUnit| Some(dto.into_domain()))
    }

    fn list_transactions(&self, limit: i64, offset: i64) -> GatewayResult<TransactionPage> {
        let body = self.get_json(&format!("/transactions?limit={}&offset={}", limit, offset))?;
        let listing: RemoteTransactionListing =
            serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        let mut page = TransactionPage {
            total: listing.total,
            ..TransactionPage::default()
        };
        for record in listing.items {
            match serde_json::from_value::<RemoteTransaction>(record)
                .ok()
                .and_then(RemoteTransaction::into_domain)
            {
                Some(tx) => page.items.push(tx),
                None => page.skipped += 1,
            }
        }
        Ok(page)
    }

    fn list_prices(&self) -> GatewayResult<FetchResult<Price>> {
        self.fetch_records("/prices", RemotePrice::into_domain)
    }

    fn get_portfolio(&self) -> GatewayResult<JsonValue> {
        self.get_json("/portfolio")
    }

    fn get_net_worth_history(&self, interval: &str) -> GatewayResult<JsonValue> {
        self.get_json(&format!("/reports/net-worth?interval={}", interval))
    }

    fn get_tax_analysis(&self) -> GatewayResult<JsonValue> {
        self.get_json("/reports/tax")
    }

    fn get_capital_gains(&self, year: i32) -> GatewayResult<JsonValue> {
        self.get_json(&format!("/reports/capital-gains?year={}", year))
    }

    fn get_cash_flow(&self, interval: &str) -> GatewayResult<JsonValue> {
        self.get_json(&format!("/reports/cash-flow?interval={}", interval))
    }

    fn submit(
        &self,
        endpoint: &str,
        method: &str,
        payload: &JsonValue,
    ) -> GatewayResult<SubmitOutcome> {
        let url = format!("{}{}", self.base_url, endpoint);
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| GatewayError::Transport(format!("invalid method: {}", method)))?;

        let response = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .map_err(map_request_error)?;

        check_response_status(&response)?;

        let body: SubmitResponse = response
            .json()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(SubmitOutcome {
            success: body.success,
        })
    }
}

/// Map request errors into the transport bucket with readable messages
fn map_request_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Transport(format!(
            "connection timed out after {} seconds",
            REQUEST_TIMEOUT_SECS
        ))
    } else if error.is_connect() {
        GatewayError::Transport("unable to connect to server".to_string())
    } else {
        GatewayError::Transport(error.to_string())
    }
}

/// Check response status and return appropriate errors
fn check_response_status(response: &reqwest::blocking::Response) -> GatewayResult<()> {
    match response.status().as_u16() {
        200..=299 => Ok(()),
        401 => Err(GatewayError::Unauthorized),
        status => Err(GatewayError::Remote(format!("HTTP {}", status))),
    }
}

// === Wire DTOs ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTag {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
}

impl RemoteTag {
    fn into_domain(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            description: self.description,
            color: self.color,
            dirty: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAccount {
    path: String,
    name: String,
    category: String,
    #[serde(rename = "type", default)]
    account_type: Option<String>,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    parent_path: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, MetaValue>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl RemoteAccount {
    fn into_domain(self) -> Option<Account> {
        if self.path.trim().is_empty() {
            return None;
        }
        let now = Utc::now();
        Some(Account {
            parent_path: self
                .parent_path
                .or_else(|| Account::parent_of(&self.path)),
            path: self.path,
            name: self.name,
            category: AccountCategory::parse(&self.category),
            account_type: self.account_type,
            currency: Account::normalize_currency(&self.currency),
            metadata: self.metadata,
            cached_xirr: None,
            xirr_computed_at: None,
            dirty: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteUnit {
    code: String,
    name: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(rename = "type", default)]
    unit_type: Option<String>,
}

impl RemoteUnit {
    fn into_domain(self) -> Unit {
        Unit {
            code: self.code,
            name: self.name,
            symbol: self.symbol,
            unit_type: self.unit_type,
            dirty: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteTransactionListing {
    /// Raw records; each is decoded individually so one malformed
    /// transaction cannot sink the page
    items: Vec<JsonValue>,
    total: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTransaction {
    id: String,
    /// ISO-8601 calendar date
    date: String,
    description: String,
    #[serde(default)]
    note: Option<String>,
    postings: Vec<RemotePosting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePosting {
    id: String,
    account_path: String,
    /// Signed decimal string
    amount: String,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    unit_code: Option<String>,
    #[serde(default)]
    tag_ids: Vec<String>,
}

impl RemoteTransaction {
    fn into_domain(self) -> Option<Transaction> {
        let id = Uuid::parse_str(&self.id).ok()?;
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;

        let mut postings = Vec::with_capacity(self.postings.len());
        for dto in self.postings {
            let amount: Decimal = dto.amount.parse().ok()?;
            let quantity = match dto.quantity {
                Some(q) => q.parse().ok()?,
                None => amount,
            };
            postings.push(Posting {
                id: Uuid::parse_str(&dto.id).ok()?,
                account_path: dto.account_path,
                amount,
                quantity,
                unit_code: dto.unit_code,
                tag_ids: dto.tag_ids,
            });
        }

        let mut tx = Transaction::new(id, date, self.description);
        tx.note = self.note;
        tx.postings = postings;
        Some(tx)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePrice {
    unit_code: String,
    date: String,
    price: String,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    source: Option<String>,
}

impl RemotePrice {
    fn into_domain(self) -> Option<Price> {
        Some(Price {
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?,
            price: self.price.parse().ok()?,
            unit_code: self.unit_code,
            currency: self.currency,
            source: self.source,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_transaction_record_is_dropped() {
        let record = serde_json::json!({
            "id": "not-a-uuid",
            "date": "2025-01-15",
            "description": "Broken",
            "postings": []
        });
        let dto: RemoteTransaction = serde_json::from_value(record).unwrap();
        assert!(dto.into_domain().is_none());
    }

    #[test]
    fn test_transaction_record_decodes() {
        let record = serde_json::json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "date": "2025-01-15",
            "description": "Groceries",
            "postings": [
                {
                    "id": "22222222-2222-2222-2222-222222222222",
                    "accountPath": "Expenses:Food",
                    "amount": "42.50",
                    "tagIds": ["groceries"]
                },
                {
                    "id": "33333333-3333-3333-3333-333333333333",
                    "accountPath": "Assets:Checking",
                    "amount": "-42.50"
                }
            ]
        });
        let dto: RemoteTransaction = serde_json::from_value(record).unwrap();
        let tx = dto.into_domain().unwrap();
        assert_eq!(tx.postings.len(), 2);
        assert_eq!(tx.postings[0].amount, Decimal::new(4250, 2));
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_account_without_path_is_dropped() {
        let dto = RemoteAccount {
            path: " ".to_string(),
            name: "Broken".to_string(),
            category: "asset".to_string(),
            account_type: None,
            currency: "USD".to_string(),
            parent_path: None,
            metadata: BTreeMap::new(),
        };
        assert!(dto.into_domain().is_none());
    }
}
