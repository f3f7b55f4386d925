//! DuckDB store implementation
//!
//! Single storage engine for the entity tables, the offline write queue,
//! the report cache, and the event log. All mutations go through one
//! connection behind a mutex, so writes are serialized per process;
//! logical units (entity write + queue item, one pull batch) commit in a
//! single DuckDB transaction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{params, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    Account, AccountCategory, MetaValue, Posting, Price, QueueItem, QueueStatus, ReportKind,
    ReportSnapshot, Tag, Transaction, Unit,
};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB store implementation
pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    /// Open the store, retrying with exponential backoff on file locking
    /// errors (app startup racing an auto-sync, for instance).
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[harbor] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Disable extension autoloading; everything needed is statically linked
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()?;
        Ok(())
    }

    // === Account operations ===

    pub fn get_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT path, name, category, account_type, currency, parent_path,
                    metadata, cached_xirr, xirr_computed_at, dirty, created_at, updated_at
             FROM sys_accounts
             ORDER BY path",
        )?;

        let accounts = stmt
            .query_map([], |row| Ok(row_to_account(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(accounts)
    }

    pub fn get_account(&self, path: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT path, name, category, account_type, currency, parent_path,
                    metadata, cached_xirr, xirr_computed_at, dirty, created_at, updated_at
             FROM sys_accounts WHERE path = ?",
        )?;

        let account = stmt.query_row([path], |row| Ok(row_to_account(row))).ok();

        Ok(account)
    }

    /// Local edit path: write the account with dirty = TRUE and its queue
    /// item in one transaction, so a crash cannot separate the two.
    pub fn save_account_local(&self, account: &Account, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        exec_upsert_account(&tx, account, true)?;
        exec_enqueue(&tx, item)?;
        tx.commit()?;
        Ok(())
    }

    /// Pull path: last-write-wins on content fields, but local-only fields
    /// (dirty, cached XIRR and its timestamp) are preserved on conflict.
    pub fn pull_upsert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_upsert_account(&conn, account, false)?;
        Ok(())
    }

    pub fn mark_account_clean(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_accounts SET dirty = FALSE WHERE path = ?",
            [path],
        )?;
        Ok(())
    }

    /// Store a freshly computed XIRR on the account, with its staleness marker
    pub fn update_account_xirr(&self, path: &str, xirr: Option<f64>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_accounts SET cached_xirr = ?, xirr_computed_at = ? WHERE path = ?",
            params![xirr, Utc::now().to_rfc3339(), path],
        )?;
        Ok(())
    }

    // === Transaction operations ===

    /// Load all live transactions with their postings, ordered by date
    pub fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT transaction_id, transaction_date::VARCHAR, description, note,
                    dirty, deleted, updated_at
             FROM sys_transactions
             WHERE NOT deleted
             ORDER BY transaction_date, transaction_id",
        )?;
        let mut transactions: Vec<Transaction> = stmt
            .query_map([], |row| Ok(row_to_transaction(row)))?
            .filter_map(|r| r.ok())
            .collect();

        let mut postings_by_tx: HashMap<Uuid, Vec<Posting>> = HashMap::new();
        let mut pstmt = conn.prepare(
            "SELECT posting_id, transaction_id, account_path, amount, quantity,
                    unit_code, tag_ids
             FROM sys_postings
             ORDER BY transaction_id, seq",
        )?;
        let rows = pstmt.query_map([], |row| {
            let tx_id: String = row.get(1)?;
            Ok((tx_id, row_to_posting(row)))
        })?;
        for row in rows.filter_map(|r| r.ok()) {
            if let Ok(tx_id) = Uuid::parse_str(&row.0) {
                postings_by_tx.entry(tx_id).or_default().push(row.1);
            }
        }

        for tx in &mut transactions {
            tx.postings = postings_by_tx.remove(&tx.id).unwrap_or_default();
        }

        Ok(transactions)
    }

    pub fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT transaction_id, transaction_date::VARCHAR, description, note,
                    dirty, deleted, updated_at
             FROM sys_transactions WHERE transaction_id = ?",
        )?;
        let tx = stmt
            .query_row([id.to_string()], |row| Ok(row_to_transaction(row)))
            .ok();

        let Some(mut tx) = tx else {
            return Ok(None);
        };

        let mut pstmt = conn.prepare(
            "SELECT posting_id, transaction_id, account_path, amount, quantity,
                    unit_code, tag_ids
             FROM sys_postings WHERE transaction_id = ? ORDER BY seq",
        )?;
        tx.postings = pstmt
            .query_map([id.to_string()], |row| Ok(row_to_posting(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(Some(tx))
    }

    /// Dirty flag of an existing transaction, or None if absent.
    /// The pull merge rule dispatches on this without loading bodies.
    pub fn get_transaction_dirty(&self, id: Uuid) -> Result<Option<bool>> {
        let conn = self.conn.lock().unwrap();
        let dirty: Option<bool> = conn
            .query_row(
                "SELECT dirty FROM sys_transactions WHERE transaction_id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .ok();
        Ok(dirty)
    }

    /// Local edit path: validate is the caller's job; this inserts the
    /// transaction (dirty = TRUE), its postings, and the queue item
    /// atomically.
    pub fn create_transaction_local(&self, tx_entity: &Transaction, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        exec_insert_transaction(&tx, tx_entity, true)?;
        exec_enqueue(&tx, item)?;
        tx.commit()?;
        Ok(())
    }

    /// Soft delete locally and enqueue the matching server operation
    pub fn delete_transaction_local(&self, id: Uuid, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE sys_transactions SET deleted = TRUE, dirty = TRUE, updated_at = ?
             WHERE transaction_id = ?",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        exec_enqueue(&tx, item)?;
        tx.commit()?;
        Ok(())
    }

    /// Apply one pull batch atomically: insert transactions absent locally
    /// and flip dirty off for the listed existing ones. Dirty locals are
    /// not in either list; the pull leaves them untouched.
    pub fn apply_transaction_batch(
        &self,
        inserts: &[Transaction],
        ensure_clean: &[Uuid],
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for entity in inserts {
            exec_insert_transaction(&tx, entity, false)?;
        }
        for id in ensure_clean {
            tx.execute(
                "UPDATE sys_transactions SET dirty = FALSE WHERE transaction_id = ?",
                [id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn mark_transaction_clean(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_transactions SET dirty = FALSE WHERE transaction_id = ?",
            [id.to_string()],
        )?;
        Ok(())
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_transactions WHERE NOT deleted",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Tag operations ===

    pub fn get_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tag_id, name, description, color, dirty FROM sys_tags ORDER BY tag_id",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0).unwrap_or_default(),
                    name: row.get(1).unwrap_or_default(),
                    description: row.get(2).ok(),
                    color: row.get(3).ok(),
                    dirty: row.get(4).unwrap_or(false),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tags)
    }

    pub fn save_tag_local(&self, tag: &Tag, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        exec_upsert_tag(&tx, tag, true)?;
        exec_enqueue(&tx, item)?;
        tx.commit()?;
        Ok(())
    }

    pub fn pull_upsert_tag(&self, tag: &Tag) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_upsert_tag(&conn, tag, false)?;
        Ok(())
    }

    pub fn mark_tag_clean(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("UPDATE sys_tags SET dirty = FALSE WHERE tag_id = ?", [id])?;
        Ok(())
    }

    // === Unit operations ===

    pub fn get_units(&self) -> Result<Vec<Unit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT code, name, symbol, unit_type, dirty FROM sys_units ORDER BY code",
        )?;
        let units = stmt
            .query_map([], |row| {
                Ok(Unit {
                    code: row.get(0).unwrap_or_default(),
                    name: row.get(1).unwrap_or_default(),
                    symbol: row.get(2).ok(),
                    unit_type: row.get(3).ok(),
                    dirty: row.get(4).unwrap_or(false),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(units)
    }

    pub fn save_unit_local(&self, unit: &Unit, item: &QueueItem) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        exec_upsert_unit(&tx, unit, true)?;
        exec_enqueue(&tx, item)?;
        tx.commit()?;
        Ok(())
    }

    pub fn pull_upsert_unit(&self, unit: &Unit) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        exec_upsert_unit(&conn, unit, false)?;
        Ok(())
    }

    pub fn mark_unit_clean(&self, code: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("UPDATE sys_units SET dirty = FALSE WHERE code = ?", [code])?;
        Ok(())
    }

    // === Price operations ===

    pub fn upsert_price(&self, price: &Price) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_prices (unit_code, price_date, price, currency, source)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (unit_code, price_date) DO UPDATE SET
                price = EXCLUDED.price,
                currency = EXCLUDED.currency,
                source = EXCLUDED.source",
            params![
                price.unit_code,
                price.date.format("%Y-%m-%d").to_string(),
                dec_to_f64(price.price),
                price.currency,
                price.source,
            ],
        )?;
        Ok(())
    }

    /// Latest price per unit code
    pub fn get_latest_prices(&self) -> Result<HashMap<String, Price>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT unit_code, price_date::VARCHAR, price, currency, source
             FROM sys_prices
             QUALIFY ROW_NUMBER() OVER (PARTITION BY unit_code ORDER BY price_date DESC) = 1",
        )?;
        let prices = stmt
            .query_map([], |row| Ok(row_to_price(row)))?
            .filter_map(|r| r.ok())
            .map(|p| (p.unit_code.clone(), p))
            .collect();
        Ok(prices)
    }

    pub fn count_prices(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_prices", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Queue operations ===

    /// All queue items regardless of state, oldest first (debug/status view)
    pub fn get_queue_items(&self) -> Result<Vec<QueueItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT item_id, operation, endpoint, method, payload,
                    created_at, last_attempt_at, retry_count, status
             FROM sys_queue
             ORDER BY created_at",
        )?;
        let items = stmt
            .query_map([], |row| Ok(row_to_queue_item(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    /// Delete a queue item after confirmed server success
    pub fn delete_queue_item(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sys_queue WHERE item_id = ?", [id.to_string()])?;
        Ok(())
    }

    /// Persist updated retry bookkeeping after a failed attempt
    pub fn update_queue_item(&self, item: &QueueItem) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_queue
             SET last_attempt_at = ?, retry_count = ?, status = ?
             WHERE item_id = ?",
            params![
                item.last_attempt_at.map(|t| t.to_rfc3339()),
                item.retry_count as i64,
                item.status.as_str(),
                item.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Debug escape hatch: drop every queued operation
    pub fn clear_queue(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM sys_queue", [])?;
        Ok(deleted)
    }

    pub fn queue_depth_by_status(&self) -> Result<HashMap<QueueStatus, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM sys_queue GROUP BY status")?;
        let depths = stmt
            .query_map([], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((QueueStatus::parse(&status), count))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(depths)
    }

    // === Report cache ===

    pub fn upsert_report(&self, snapshot: &ReportSnapshot) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_reports (kind, report_key, payload, fetched_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (kind, report_key) DO UPDATE SET
                payload = EXCLUDED.payload,
                fetched_at = EXCLUDED.fetched_at",
            params![
                snapshot.kind.as_str(),
                snapshot.key,
                snapshot.payload.to_string(),
                snapshot.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_report(&self, kind: ReportKind, key: &str) -> Result<Option<ReportSnapshot>> {
        let conn = self.conn.lock().unwrap();
        let snapshot = conn
            .query_row(
                "SELECT kind, report_key, payload, fetched_at
                 FROM sys_reports WHERE kind = ? AND report_key = ?",
                params![kind.as_str(), key],
                |row| {
                    let kind_str: String = row.get(0)?;
                    let payload_str: String = row.get(2)?;
                    let fetched_str: String = row.get(3)?;
                    Ok(ReportSnapshot {
                        kind: ReportKind::parse(&kind_str).unwrap_or(ReportKind::Portfolio),
                        key: row.get(1)?,
                        payload: serde_json::from_str(&payload_str)
                            .unwrap_or(serde_json::Value::Null),
                        fetched_at: parse_timestamp(&fetched_str),
                    })
                },
            )
            .ok();
        Ok(snapshot)
    }

    // === Event log ===

    pub fn insert_event(
        &self,
        event: &str,
        resource: Option<&str>,
        count: i64,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_events (event_id, ts, event, resource, count, error_message)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                Utc::now().to_rfc3339(),
                event,
                resource,
                count,
                error_message,
            ],
        )?;
        Ok(())
    }

    /// Sum of `count` across occurrences of an event name
    pub fn event_total(&self, event: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM sys_events WHERE event = ?",
            [event],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // === Counts and debug ===

    pub fn count_accounts(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_tags(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_tags", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_units(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_units", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Debug escape hatch: wipe every entity table, the queue, the report
    /// cache, and the event log
    pub fn clear_all_local_data(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for table in [
            "sys_postings",
            "sys_transactions",
            "sys_accounts",
            "sys_tags",
            "sys_units",
            "sys_prices",
            "sys_queue",
            "sys_reports",
            "sys_events",
        ] {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        Ok(())
    }
}

// === Statement helpers shared by the single and transactional paths ===

fn exec_enqueue(conn: &Connection, item: &QueueItem) -> Result<()> {
    conn.execute(
        "INSERT INTO sys_queue (item_id, operation, endpoint, method, payload,
                                created_at, last_attempt_at, retry_count, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            item.id.to_string(),
            item.operation,
            item.endpoint,
            item.method,
            item.payload.to_string(),
            item.created_at.to_rfc3339(),
            item.last_attempt_at.map(|t| t.to_rfc3339()),
            item.retry_count as i64,
            item.status.as_str(),
        ],
    )?;
    Ok(())
}

fn exec_upsert_account(conn: &Connection, account: &Account, dirty: bool) -> Result<()> {
    let metadata = serde_json::to_string(&account.metadata).unwrap_or_else(|_| "{}".to_string());

    // On the pull path (dirty = false) the local dirty flag and cached
    // metric survive the conflict; content fields are last-write-wins.
    conn.execute(
        "INSERT INTO sys_accounts (path, name, category, account_type, currency, parent_path,
                                   metadata, cached_xirr, xirr_computed_at, dirty,
                                   created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (path) DO UPDATE SET
            name = EXCLUDED.name,
            category = EXCLUDED.category,
            account_type = COALESCE(EXCLUDED.account_type, sys_accounts.account_type),
            currency = EXCLUDED.currency,
            parent_path = EXCLUDED.parent_path,
            metadata = EXCLUDED.metadata,
            cached_xirr = COALESCE(sys_accounts.cached_xirr, EXCLUDED.cached_xirr),
            xirr_computed_at = COALESCE(sys_accounts.xirr_computed_at, EXCLUDED.xirr_computed_at),
            dirty = CASE WHEN EXCLUDED.dirty THEN TRUE ELSE sys_accounts.dirty END,
            updated_at = EXCLUDED.updated_at",
        params![
            account.path,
            account.name,
            account.category.as_str(),
            account.account_type,
            Account::normalize_currency(&account.currency),
            account.parent_path,
            metadata,
            account.cached_xirr,
            account.xirr_computed_at.map(|t| t.to_rfc3339()),
            dirty,
            account.created_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn exec_upsert_tag(conn: &Connection, tag: &Tag, dirty: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO sys_tags (tag_id, name, description, color, dirty)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (tag_id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            color = EXCLUDED.color,
            dirty = CASE WHEN EXCLUDED.dirty THEN TRUE ELSE sys_tags.dirty END",
        params![tag.id, tag.name, tag.description, tag.color, dirty],
    )?;
    Ok(())
}

fn exec_upsert_unit(conn: &Connection, unit: &Unit, dirty: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO sys_units (code, name, symbol, unit_type, dirty)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (code) DO UPDATE SET
            name = EXCLUDED.name,
            symbol = EXCLUDED.symbol,
            unit_type = EXCLUDED.unit_type,
            dirty = CASE WHEN EXCLUDED.dirty THEN TRUE ELSE sys_units.dirty END",
        params![unit.code, unit.name, unit.symbol, unit.unit_type, dirty],
    )?;
    Ok(())
}

fn exec_insert_transaction(conn: &Connection, entity: &Transaction, dirty: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO sys_transactions (transaction_id, transaction_date, description, note,
                                       dirty, deleted, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            entity.id.to_string(),
            entity.date.format("%Y-%m-%d").to_string(),
            entity.description,
            entity.note,
            dirty,
            entity.deleted,
            entity.updated_at.to_rfc3339(),
        ],
    )?;

    for (seq, posting) in entity.postings.iter().enumerate() {
        let tag_ids =
            serde_json::to_string(&posting.tag_ids).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "INSERT INTO sys_postings (posting_id, transaction_id, seq, account_path,
                                       amount, quantity, unit_code, tag_ids)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                posting.id.to_string(),
                entity.id.to_string(),
                seq as i64,
                posting.account_path,
                dec_to_f64(posting.amount),
                dec_to_f64(posting.quantity),
                posting.unit_code,
                tag_ids,
            ],
        )?;
    }

    Ok(())
}

// === Row mapping ===

fn row_to_account(row: &duckdb::Row) -> Account {
    let category: String = row.get(2).unwrap_or_default();
    let metadata_json: String = row.get(6).unwrap_or_else(|_| "{}".to_string());
    let xirr_at: Option<String> = row.get(8).ok();
    let created_str: String = row.get(10).unwrap_or_default();
    let updated_str: String = row.get(11).unwrap_or_default();

    Account {
        path: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        category: AccountCategory::parse(&category),
        account_type: row.get(3).ok(),
        currency: row.get(4).unwrap_or_else(|_| "USD".to_string()),
        parent_path: row.get(5).ok(),
        metadata: serde_json::from_str::<std::collections::BTreeMap<String, MetaValue>>(
            &metadata_json,
        )
        .unwrap_or_default(),
        cached_xirr: row.get::<_, Option<f64>>(7).ok().flatten(),
        xirr_computed_at: xirr_at.map(|s| parse_timestamp(&s)),
        dirty: row.get(9).unwrap_or(false),
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    }
}

fn row_to_transaction(row: &duckdb::Row) -> Transaction {
    let id_str: String = row.get(0).unwrap_or_default();
    let date_str: String = row.get(1).unwrap_or_default();
    let updated_str: String = row.get(6).unwrap_or_default();

    Transaction {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        date: parse_date(&date_str),
        description: row.get(2).unwrap_or_default(),
        note: row.get(3).ok(),
        postings: Vec::new(),
        dirty: row.get(4).unwrap_or(false),
        deleted: row.get(5).unwrap_or(false),
        updated_at: parse_timestamp(&updated_str),
    }
}

fn row_to_posting(row: &duckdb::Row) -> Posting {
    let id_str: String = row.get(0).unwrap_or_default();
    let amount: f64 = row.get(3).unwrap_or(0.0);
    let quantity: f64 = row.get(4).unwrap_or(0.0);
    let tag_ids_json: String = row.get(6).unwrap_or_else(|_| "[]".to_string());

    Posting {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        account_path: row.get(2).unwrap_or_default(),
        amount: Decimal::try_from(amount).unwrap_or_default(),
        quantity: Decimal::try_from(quantity).unwrap_or_default(),
        unit_code: row.get(5).ok(),
        tag_ids: serde_json::from_str(&tag_ids_json).unwrap_or_default(),
    }
}

fn row_to_price(row: &duckdb::Row) -> Price {
    let date_str: String = row.get(1).unwrap_or_default();
    let price: f64 = row.get(2).unwrap_or(0.0);

    Price {
        unit_code: row.get(0).unwrap_or_default(),
        date: parse_date(&date_str),
        price: Decimal::try_from(price).unwrap_or_default(),
        currency: row.get(3).unwrap_or_else(|_| "USD".to_string()),
        source: row.get(4).ok(),
    }
}

fn row_to_queue_item(row: &duckdb::Row) -> QueueItem {
    let id_str: String = row.get(0).unwrap_or_default();
    let payload_str: String = row.get(4).unwrap_or_else(|_| "{}".to_string());
    let created_str: String = row.get(5).unwrap_or_default();
    let last_attempt: Option<String> = row.get(6).ok();
    let retry_count: i64 = row.get(7).unwrap_or(0);
    let status: String = row.get(8).unwrap_or_else(|_| "pending".to_string());

    QueueItem {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        operation: row.get(1).unwrap_or_default(),
        endpoint: row.get(2).unwrap_or_default(),
        method: row.get(3).unwrap_or_default(),
        payload: serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null),
        created_at: parse_timestamp(&created_str),
        last_attempt_at: last_attempt.map(|s| parse_timestamp(&s)),
        retry_count: retry_count.max(0) as u32,
        status: QueueStatus::parse(&status),
    }
}

// === Parsing helpers ===

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
