//! Integration tests for the sync engine
//!
//! These tests verify the queue lifecycle and the push/pull merge rules
//! using real DuckDB storage. The remote side is mocked at the gateway
//! trait level.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use uuid::Uuid;

use harbor_core::adapters::demo::DemoGateway;
use harbor_core::adapters::duckdb::DuckDbStore;
use harbor_core::domain::{
    Posting, Price, QueueStatus, Tag, Transaction, Unit, RETRY_CEILING,
};
use harbor_core::ports::{
    AuthProvider, ConnectivityProvider, FetchResult, GatewayError, GatewayResult, RemoteGateway,
    SubmitOutcome, TransactionPage,
};
use harbor_core::services::{
    AnalyticsService, LedgerService, PullScope, QueueService, SyncService,
};
use harbor_core::Account;
use harbor_core::AccountCategory;

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test store with schema initialized
fn create_test_store(temp_dir: &TempDir) -> Arc<DuckDbStore> {
    let db_path = temp_dir.path().join("test.duckdb");
    let store = DuckDbStore::new(&db_path).expect("Failed to create store");
    store.ensure_schema().expect("Failed to initialize schema");
    Arc::new(store)
}

/// Auth collaborator that counts de-authentication calls
#[derive(Default)]
struct TestAuth {
    deauth_calls: AtomicU32,
}

impl AuthProvider for TestAuth {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn deauthenticate(&self) {
        self.deauth_calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct AlwaysOnline;

impl ConnectivityProvider for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Wire a sync service plus its collaborators around a gateway
fn build_sync(
    store: &Arc<DuckDbStore>,
    gateway: Arc<dyn RemoteGateway>,
    page_size: i64,
) -> (SyncService, Arc<TestAuth>, Arc<AnalyticsService>) {
    let auth = Arc::new(TestAuth::default());
    let analytics = Arc::new(AnalyticsService::new(Arc::clone(store), 4));
    let sync = SyncService::new(
        Arc::clone(store),
        gateway,
        Arc::clone(&auth) as Arc<dyn AuthProvider>,
        Arc::new(AlwaysOnline),
        Arc::clone(&analytics),
        page_size,
    );
    (sync, auth, analytics)
}

fn build_ledger(store: &Arc<DuckDbStore>) -> LedgerService {
    let analytics = Arc::new(AnalyticsService::new(Arc::clone(store), 4));
    LedgerService::new(Arc::clone(store), analytics)
}

/// Balanced two-posting expense transaction
fn expense_tx(date: NaiveDate, description: &str, cents: i64) -> Transaction {
    let mut tx = Transaction::new(Uuid::new_v4(), date, description);
    tx.postings
        .push(Posting::new("Expenses:Food", Decimal::new(cents, 2)));
    tx.postings
        .push(Posting::new("Assets:Checking", Decimal::new(-cents, 2)));
    tx
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, n).unwrap()
}

/// Configurable trait-level gateway mock
#[derive(Default)]
struct MockGateway {
    transactions: Vec<Transaction>,
    /// Submissions whose payload description equals this marker fail
    /// with a transport error
    submit_fail_marker: Option<String>,
    /// Every submission fails with a transport error
    submit_fail_all: bool,
    /// Every submission is rejected as unauthorized
    submit_unauthorized: bool,
    /// Malformed record count reported on the first transactions page
    malformed_on_first_page: u32,
    /// Transaction pages at or beyond this offset fail (simulated
    /// interruption); None means healthy
    fail_transactions_at_offset: Mutex<Option<i64>>,
    /// When present, list_tags blocks until a message arrives
    block_tags_until: Mutex<Option<Receiver<()>>>,
    submissions: Mutex<Vec<JsonValue>>,
}

impl MockGateway {
    fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Self::default()
        }
    }

    fn heal_transactions(&self) {
        *self.fail_transactions_at_offset.lock().unwrap() = None;
    }
}

impl RemoteGateway for MockGateway {
    fn list_tags(&self) -> GatewayResult<FetchResult<Tag>> {
        if let Some(rx) = self.block_tags_until.lock().unwrap().take() {
            let _ = rx.recv();
        }
        Ok(FetchResult::default())
    }

    fn list_accounts(&self) -> GatewayResult<FetchResult<Account>> {
        Ok(FetchResult::default())
    }

    fn list_units(&self) -> GatewayResult<FetchResult<Unit>> {
        Ok(FetchResult::default())
    }

    fn list_transactions(&self, limit: i64, offset: i64) -> GatewayResult<TransactionPage> {
        if let Some(fail_at) = *self.fail_transactions_at_offset.lock().unwrap() {
            if offset >= fail_at {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
        }

        let total = self.transactions.len() as i64;
        let start = offset.clamp(0, total) as usize;
        let end = (offset + limit).clamp(0, total) as usize;
        Ok(TransactionPage {
            items: self.transactions[start..end].to_vec(),
            total,
            skipped: if offset == 0 {
                self.malformed_on_first_page
            } else {
                0
            },
        })
    }

    fn list_prices(&self) -> GatewayResult<FetchResult<Price>> {
        Ok(FetchResult::default())
    }

    fn get_portfolio(&self) -> GatewayResult<JsonValue> {
        Ok(json!({}))
    }

    fn get_net_worth_history(&self, _interval: &str) -> GatewayResult<JsonValue> {
        Ok(json!({}))
    }

    fn get_tax_analysis(&self) -> GatewayResult<JsonValue> {
        Ok(json!({}))
    }

    fn get_capital_gains(&self, _year: i32) -> GatewayResult<JsonValue> {
        Ok(json!({}))
    }

    fn get_cash_flow(&self, _interval: &str) -> GatewayResult<JsonValue> {
        Ok(json!({}))
    }

    fn submit(
        &self,
        _endpoint: &str,
        _method: &str,
        payload: &JsonValue,
    ) -> GatewayResult<SubmitOutcome> {
        if self.submit_unauthorized {
            return Err(GatewayError::Unauthorized);
        }
        if self.submit_fail_all {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        if let Some(marker) = &self.submit_fail_marker {
            if payload.get("description").and_then(|d| d.as_str()) == Some(marker) {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
        }
        self.submissions.lock().unwrap().push(payload.clone());
        Ok(SubmitOutcome { success: true })
    }
}

// ============================================================================
// Queue lifecycle
// ============================================================================

/// A local write and its queue item commit together
#[test]
fn test_local_write_enqueues_atomically() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    let tx = expense_tx(day(1), "Coffee", 450);
    let tx_id = tx.id;
    ledger.create_transaction(tx).unwrap();

    let items = store.get_queue_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].operation, "transaction.create");
    assert_eq!(items[0].status, QueueStatus::Pending);
    assert_eq!(items[0].retry_count, 0);

    let stored = store.get_transaction(tx_id).unwrap().unwrap();
    assert!(stored.dirty, "locally authored transaction starts dirty");
    assert_eq!(stored.postings.len(), 2);
}

/// The double-entry invariant is enforced before anything is stored
#[test]
fn test_unbalanced_transaction_rejected_at_write() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    let mut tx = expense_tx(day(1), "Broken", 450);
    tx.postings[1].amount = Decimal::new(-400, 2);

    assert!(ledger.create_transaction(tx).is_err());
    assert_eq!(store.count_transactions().unwrap(), 0);
    assert!(store.get_queue_items().unwrap().is_empty());
}

/// Three writes, two delivered, one failing its first attempt leaves
/// exactly one retrying item with retry_count 1
#[test]
fn test_push_two_succeed_one_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    ledger.create_transaction(expense_tx(day(1), "Groceries", 8000)).unwrap();
    ledger.create_transaction(expense_tx(day(2), "fail-me", 1200)).unwrap();
    ledger.create_transaction(expense_tx(day(3), "Lunch", 1500)).unwrap();

    let gateway = Arc::new(MockGateway {
        submit_fail_marker: Some("fail-me".to_string()),
        ..MockGateway::default()
    });
    let (sync, _, _) = build_sync(&store, gateway, 100);

    let report = sync.push_only();
    let push = report.push.unwrap();
    assert_eq!(push.attempted, 3);
    assert_eq!(push.delivered, 2);
    assert_eq!(push.failed, 1);

    let items = store.get_queue_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].retry_count, 1);
    assert_eq!(items[0].status, QueueStatus::Retrying);
    assert_eq!(
        items[0].payload.get("description").and_then(|d| d.as_str()),
        Some("fail-me")
    );
}

/// A delivered queue item flips its entity clean
#[test]
fn test_push_success_acknowledges_entity() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    let tx = expense_tx(day(1), "Groceries", 8000);
    let tx_id = tx.id;
    ledger.create_transaction(tx).unwrap();

    let (sync, _, _) = build_sync(&store, Arc::new(MockGateway::default()), 100);
    sync.push_only();

    assert!(store.get_queue_items().unwrap().is_empty());
    let stored = store.get_transaction(tx_id).unwrap().unwrap();
    assert!(!stored.dirty, "acknowledged transaction is clean");
}

/// An item that keeps failing becomes terminal at the ceiling and is
/// excluded from delivery forever
#[test]
fn test_queue_item_terminal_after_ceiling() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);
    let queue = QueueService::new(Arc::clone(&store));

    ledger.create_transaction(expense_tx(day(1), "Doomed", 100)).unwrap();

    for _ in 0..RETRY_CEILING {
        let items = store.get_queue_items().unwrap();
        queue.record_result(&items[0], false).unwrap();
    }

    let items = store.get_queue_items().unwrap();
    assert_eq!(items.len(), 1, "failed items are retained for inspection");
    assert_eq!(items[0].status, QueueStatus::Failed);
    assert_eq!(items[0].retry_count, RETRY_CEILING);
    assert!(
        queue.next_batch().unwrap().is_empty(),
        "terminal items never reappear in a batch"
    );
}

/// Items inside their backoff window are excluded from the next batch
#[test]
fn test_backoff_window_excludes_from_batch() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);
    let queue = QueueService::new(Arc::clone(&store));

    ledger.create_transaction(expense_tx(day(1), "Slow", 100)).unwrap();

    let items = store.get_queue_items().unwrap();
    queue.record_result(&items[0], false).unwrap();

    // Just failed: the 60s backoff window for retry_count=1 is still open
    assert!(queue.next_batch().unwrap().is_empty());

    let items = store.get_queue_items().unwrap();
    assert_eq!(items[0].status, QueueStatus::Retrying);
}

#[test]
fn test_clear_queue_escape_hatch() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);
    let queue = QueueService::new(Arc::clone(&store));

    ledger.create_transaction(expense_tx(day(1), "A", 100)).unwrap();
    ledger.create_transaction(expense_tx(day(2), "B", 200)).unwrap();

    let result = queue.clear().unwrap();
    assert_eq!(result.deleted, 2);
    assert!(store.get_queue_items().unwrap().is_empty());
}

// ============================================================================
// Push/pull isolation and auth
// ============================================================================

/// Push failures must not prevent the pull from running
#[test]
fn test_push_failure_does_not_block_pull() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    ledger.create_transaction(expense_tx(day(1), "Unsendable", 300)).unwrap();

    let remote = vec![expense_tx(day(10), "Remote", 500)];
    let gateway = Arc::new(MockGateway {
        submit_fail_all: true,
        ..MockGateway::with_transactions(remote)
    });
    let (sync, _, _) = build_sync(&store, gateway, 100);

    let report = sync.perform_full_sync();
    let push = report.push.unwrap();
    let pull = report.pull.unwrap();

    assert_eq!(push.failed, 1);
    assert!(pull.error.is_none());
    let tx_report = pull
        .resources
        .iter()
        .find(|r| r.resource == "transactions")
        .unwrap();
    assert_eq!(tx_report.upserted, 1);

    // Local transaction plus the pulled remote one
    assert_eq!(store.count_transactions().unwrap(), 2);
}

/// An unauthorized response de-authenticates once and aborts the push
/// without burning retry budget
#[test]
fn test_unauthorized_triggers_deauth() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    ledger.create_transaction(expense_tx(day(1), "A", 100)).unwrap();
    ledger.create_transaction(expense_tx(day(2), "B", 200)).unwrap();

    let gateway = Arc::new(MockGateway {
        submit_unauthorized: true,
        ..MockGateway::default()
    });
    let (sync, auth, _) = build_sync(&store, gateway, 100);

    let report = sync.push_only();
    let push = report.push.unwrap();

    assert!(push.deauthorized);
    assert_eq!(auth.deauth_calls.load(Ordering::SeqCst), 1);

    // Not ordinary retry handling: both items untouched
    let items = store.get_queue_items().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.retry_count == 0));
}

// ============================================================================
// Pull merge rules
// ============================================================================

/// Full sync against the demo fixtures populates every table
#[test]
fn test_full_sync_populates_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let gateway = Arc::new(DemoGateway::new());
    let expected_txs = gateway.list_transactions(1000, 0).unwrap().total;
    let (sync, _, _) = build_sync(&store, gateway, 10);

    let report = sync.perform_full_sync();
    assert!(!report.skipped);
    assert!(report.pull.as_ref().unwrap().error.is_none());

    assert_eq!(store.count_accounts().unwrap(), 7);
    assert_eq!(store.count_tags().unwrap(), 4);
    assert_eq!(store.count_units().unwrap(), 2);
    assert_eq!(store.count_transactions().unwrap(), expected_txs);
    assert!(store.count_prices().unwrap() > 0);
    assert!(store
        .get_report(harbor_core::domain::ReportKind::Portfolio, "")
        .unwrap()
        .is_some());
}

/// Running the same pull twice produces the same store state
#[test]
fn test_pull_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let gateway = Arc::new(DemoGateway::new());
    let (sync, _, _) = build_sync(&store, gateway, 10);

    sync.perform_full_sync();
    let count_first = store.count_transactions().unwrap();
    let accounts_first = store.count_accounts().unwrap();

    let report = sync.perform_full_sync();
    assert_eq!(store.count_transactions().unwrap(), count_first);
    assert_eq!(store.count_accounts().unwrap(), accounts_first);

    let pull = report.pull.unwrap();
    let tx_report = pull
        .resources
        .iter()
        .find(|r| r.resource == "transactions")
        .unwrap();
    assert_eq!(tx_report.upserted, 0);
    assert_eq!(tx_report.skipped_existing, count_first);
}

/// A non-dirty transaction's body is never rewritten by a pull
#[test]
fn test_pull_never_rewrites_clean_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let original = expense_tx(day(5), "Original", 1000);
    let tx_id = original.id;

    let gateway = Arc::new(MockGateway::with_transactions(vec![original]));
    let (sync, _, _) = build_sync(&store, gateway, 100);
    sync.perform_full_sync();

    // Remote now serves a mutated copy under the same id
    let mut mutated = expense_tx(day(5), "Rewritten", 9999);
    mutated.id = tx_id;
    let gateway = Arc::new(MockGateway::with_transactions(vec![mutated]));
    let (sync, _, _) = build_sync(&store, gateway, 100);
    sync.perform_full_sync();

    let stored = store.get_transaction(tx_id).unwrap().unwrap();
    assert_eq!(stored.description, "Original");
    assert_eq!(stored.postings[0].amount, Decimal::new(1000, 2));
    assert!(!stored.dirty);
}

/// A dirty transaction is left entirely untouched by a pull; local edits
/// win until they sync out
#[test]
fn test_pull_preserves_dirty_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    let local = expense_tx(day(5), "Local edit", 1000);
    let tx_id = local.id;
    ledger.create_transaction(local).unwrap();

    // The remote already carries a racing copy of the same transaction
    let mut racing = expense_tx(day(5), "Server copy", 2222);
    racing.id = tx_id;
    let gateway = Arc::new(MockGateway {
        submit_fail_all: true, // push keeps failing, tx stays dirty
        ..MockGateway::with_transactions(vec![racing])
    });
    let (sync, _, _) = build_sync(&store, gateway, 100);

    let report = sync.perform_full_sync();
    let pull = report.pull.unwrap();
    let tx_report = pull
        .resources
        .iter()
        .find(|r| r.resource == "transactions")
        .unwrap();
    assert_eq!(tx_report.skipped_dirty, 1);

    let stored = store.get_transaction(tx_id).unwrap().unwrap();
    assert_eq!(stored.description, "Local edit");
    assert!(stored.dirty, "a pull never clears a dirty transaction");
}

/// Interrupted pull resumes without duplicating committed batches
#[test]
fn test_interrupted_pull_resumes_without_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let remote: Vec<Transaction> = (0..50)
        .map(|i| expense_tx(day(1 + (i % 28)), &format!("Remote {}", i), 100 + i as i64))
        .collect();

    let gateway = Arc::new(MockGateway {
        fail_transactions_at_offset: Mutex::new(Some(20)),
        ..MockGateway::with_transactions(remote)
    });
    let (sync, _, _) = build_sync(&store, Arc::clone(&gateway) as Arc<dyn RemoteGateway>, 10);

    let report = sync.perform_full_sync();
    assert!(report.pull.unwrap().error.is_some());
    assert_eq!(
        store.count_transactions().unwrap(),
        20,
        "two pages committed before the interruption"
    );

    gateway.heal_transactions();
    let report = sync.perform_full_sync();
    let pull = report.pull.unwrap();
    assert!(pull.error.is_none());

    let tx_report = pull
        .resources
        .iter()
        .find(|r| r.resource == "transactions")
        .unwrap();
    assert_eq!(tx_report.skipped_existing, 20);
    assert_eq!(tx_report.upserted, 30);
    assert_eq!(store.count_transactions().unwrap(), 50);
}

/// Malformed remote records are dropped silently but counted and logged
#[test]
fn test_malformed_records_counted_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let gateway = Arc::new(MockGateway {
        malformed_on_first_page: 2,
        ..MockGateway::with_transactions(vec![expense_tx(day(3), "Good", 700)])
    });
    let (sync, _, _) = build_sync(&store, gateway, 100);

    let report = sync.perform_full_sync();
    let pull = report.pull.unwrap();
    assert!(pull.error.is_none());

    let tx_report = pull
        .resources
        .iter()
        .find(|r| r.resource == "transactions")
        .unwrap();
    assert_eq!(tx_report.skipped_malformed, 2);
    assert_eq!(tx_report.upserted, 1);

    // Observable through the event log as well
    assert_eq!(store.event_total("pull.record_skipped").unwrap(), 2);
}

// ============================================================================
// Concurrency guard
// ============================================================================

/// A second trigger while a sync is in flight is a silent no-op
#[test]
fn test_single_flight_guard_collapses_overlap() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let (release, blocked): (Sender<()>, Receiver<()>) = channel();
    let gateway = Arc::new(MockGateway {
        block_tags_until: Mutex::new(Some(blocked)),
        ..MockGateway::default()
    });
    let (sync, _, _) = build_sync(&store, gateway, 100);
    let sync = Arc::new(sync);

    let background = {
        let sync = Arc::clone(&sync);
        std::thread::spawn(move || sync.perform_full_sync())
    };

    // Wait until the background cycle owns the guard
    while !sync.state().is_syncing {
        std::thread::yield_now();
    }

    let overlapping = sync.perform_full_sync();
    assert!(overlapping.skipped, "overlapping trigger must collapse");

    release.send(()).unwrap();
    let first = background.join().unwrap();
    assert!(!first.skipped);
    assert!(!sync.state().is_syncing);
}

// ============================================================================
// Narrow flows
// ============================================================================

/// A scoped pull still drains the queue first
#[test]
fn test_pull_only_drains_queue_first() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);

    ledger.create_transaction(expense_tx(day(1), "Queued", 300)).unwrap();

    let gateway = Arc::new(MockGateway::default());
    let (sync, _, _) = build_sync(&store, Arc::clone(&gateway) as Arc<dyn RemoteGateway>, 100);

    let report = sync.pull_only(PullScope::Transactions);
    let push = report.push.unwrap();
    assert_eq!(push.delivered, 1);
    assert_eq!(gateway.submissions.lock().unwrap().len(), 1);

    let pull = report.pull.unwrap();
    assert_eq!(pull.resources.len(), 1);
    assert_eq!(pull.resources[0].resource, "transactions");
}

/// Pulled accounts keep locally cached metrics and dirty flags
#[test]
fn test_pull_account_preserves_local_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);

    let mut account = Account::new("Assets:Brokerage", "Brokerage", AccountCategory::Asset);
    account.account_type = Some("Investment".to_string());
    store.pull_upsert_account(&account).unwrap();
    store.update_account_xirr("Assets:Brokerage", Some(0.07)).unwrap();

    // Remote copy has a new display name and no knowledge of the metric
    let renamed = Account::new("Assets:Brokerage", "Brokerage (Main)", AccountCategory::Asset);
    store.pull_upsert_account(&renamed).unwrap();

    let stored = store.get_account("Assets:Brokerage").unwrap().unwrap();
    assert_eq!(stored.name, "Brokerage (Main)");
    assert_eq!(stored.cached_xirr, Some(0.07));
    assert!(stored.xirr_computed_at.is_some());
    assert!(!stored.dirty);
}

/// The reconnect trigger syncs only on the offline-to-online transition
#[test]
fn test_reconnect_trigger_fires_once_per_transition() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let (sync, _, _) = build_sync(&store, Arc::new(MockGateway::default()), 100);

    // Fresh state starts offline, so the first online signal syncs
    let report = sync.handle_connectivity_change(true);
    assert!(report.is_some());
    assert!(!report.unwrap().skipped);

    // Already online: no transition, no sync
    assert!(sync.handle_connectivity_change(true).is_none());

    // Going offline never syncs
    assert!(sync.handle_connectivity_change(false).is_none());
    assert!(!sync.state().online);
}

/// Queue depths surface per status for operator inspection
#[test]
fn test_queue_depth_by_status() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir);
    let ledger = build_ledger(&store);
    let queue = QueueService::new(Arc::clone(&store));

    ledger.create_transaction(expense_tx(day(1), "A", 100)).unwrap();
    ledger.create_transaction(expense_tx(day(2), "B", 200)).unwrap();

    let items = store.get_queue_items().unwrap();
    queue.record_result(&items[0], false).unwrap();

    let depths: HashMap<QueueStatus, i64> = store.queue_depth_by_status().unwrap();
    assert_eq!(depths.get(&QueueStatus::Pending).copied().unwrap_or(0), 1);
    assert_eq!(depths.get(&QueueStatus::Retrying).copied().unwrap_or(0), 1);
}
