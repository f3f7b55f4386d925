//! Sync service - push-then-pull reconciliation with the remote server
//!
//! The orchestrator drains the offline write queue, then pulls canonical
//! remote state resource by resource in a fixed order, merging it into the
//! local store without clobbering unsynced local work. It never raises to
//! its callers: every failure lands in the returned report and the event
//! log, and the worst observable effect is a stale last-sync time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::{ReportKind, ReportSnapshot, Transaction};
use crate::ports::{AuthProvider, ConnectivityProvider, GatewayError, RemoteGateway};
use crate::services::{AnalyticsService, LogEvent, QueueService, SyncLogger};

/// Transactions committed per batch during the paginated pull, bounding
/// peak memory and keeping partial progress durable if interrupted
const TX_BATCH_SIZE: usize = 10;

/// Scope of a pull cycle. Narrow scopes still drain the write queue first
/// so local writes reach the server before remote reads overwrite
/// client-visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullScope {
    Full,
    Tags,
    Accounts,
    Units,
    Transactions,
    Prices,
    Reports,
}

/// UI-facing coordination state, published atomically under one lock
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    pub is_syncing: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub online: bool,
}

/// Sync service for queue draining and remote reconciliation
pub struct SyncService {
    store: Arc<DuckDbStore>,
    queue: QueueService,
    gateway: Arc<dyn RemoteGateway>,
    auth: Arc<dyn AuthProvider>,
    connectivity: Arc<dyn ConnectivityProvider>,
    analytics: Arc<AnalyticsService>,
    logger: SyncLogger,
    page_size: i64,
    /// Single-flight guard: overlapping triggers collapse into no-ops
    in_flight: AtomicBool,
    state: Mutex<SyncState>,
}

impl SyncService {
    pub fn new(
        store: Arc<DuckDbStore>,
        gateway: Arc<dyn RemoteGateway>,
        auth: Arc<dyn AuthProvider>,
        connectivity: Arc<dyn ConnectivityProvider>,
        analytics: Arc<AnalyticsService>,
        page_size: i64,
    ) -> Self {
        let queue = QueueService::new(Arc::clone(&store));
        let logger = SyncLogger::new(Arc::clone(&store));
        Self {
            store,
            queue,
            gateway,
            auth,
            connectivity,
            analytics,
            logger,
            page_size,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Snapshot of the coordination state
    pub fn state(&self) -> SyncState {
        self.state.lock().unwrap().clone()
    }

    /// Full push-then-pull cycle. Infallible to callers; a cycle already
    /// in flight turns this into a silent no-op.
    pub fn perform_full_sync(&self) -> SyncReport {
        self.run_cycle(Some(PullScope::Full))
    }

    /// Drain the write queue without pulling
    pub fn push_only(&self) -> SyncReport {
        self.run_cycle(None)
    }

    /// Pull a single scope. The queue is still drained first to preserve
    /// write-before-read ordering.
    pub fn pull_only(&self, scope: PullScope) -> SyncReport {
        self.run_cycle(Some(scope))
    }

    /// Connectivity trigger: record the new state and sync on the
    /// disconnected-to-connected transition.
    pub fn handle_connectivity_change(&self, online: bool) -> Option<SyncReport> {
        let was_online = {
            let mut state = self.state.lock().unwrap();
            let was = state.online;
            state.online = online;
            was
        };
        if online && !was_online {
            return Some(self.perform_full_sync());
        }
        None
    }

    /// Every cycle drains the queue first; `pull` selects what, if
    /// anything, is pulled afterwards
    fn run_cycle(&self, pull: Option<PullScope>) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return SyncReport::skipped();
        }

        {
            let mut state = self.state.lock().unwrap();
            state.is_syncing = true;
        }

        let push_report = Some(self.push_cycle());
        let pull_report = pull.map(|scope| self.pull_cycle(scope));

        // The store changed under the dashboard's feet; force a rebuild
        self.analytics.invalidate();

        let cycle_ok = push_report.as_ref().map_or(true, |p| p.error.is_none())
            && pull_report.as_ref().map_or(true, |p| p.error.is_none());

        {
            let mut state = self.state.lock().unwrap();
            state.is_syncing = false;
            state.online = self.connectivity.is_online();
            if cycle_ok {
                state.last_sync_at = Some(Utc::now());
            }
        }

        self.in_flight.store(false, Ordering::Release);

        SyncReport {
            skipped: false,
            push: push_report,
            pull: pull_report,
        }
    }

    // === Push ===

    /// Submit every due queue item. Push failures never prevent the pull
    /// from running; they only feed the queue's retry bookkeeping. An
    /// unauthorized response de-authenticates globally and aborts the
    /// remainder of the push.
    fn push_cycle(&self) -> PushReport {
        let mut report = PushReport::default();

        let batch = match self.queue.next_batch() {
            Ok(batch) => batch,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };

        for item in batch {
            report.attempted += 1;

            match self
                .gateway
                .submit(&item.endpoint, &item.method, &item.payload)
            {
                Ok(outcome) if outcome.success => {
                    report.delivered += 1;
                    if let Err(e) = self.queue.record_result(&item, true) {
                        report.error = Some(e.to_string());
                        break;
                    }
                    self.acknowledge(&item);
                }
                Ok(_) => {
                    report.failed += 1;
                    if self.queue.record_result(&item, false).is_err() {
                        break;
                    }
                }
                Err(GatewayError::Unauthorized) => {
                    // Not ordinary retry handling: de-auth and stop pushing
                    self.auth.deauthenticate();
                    report.deauthorized = true;
                    self.logger.log(LogEvent::new("push.unauthorized"));
                    break;
                }
                Err(e) => {
                    report.failed += 1;
                    self.logger.log(
                        LogEvent::new("push.failed")
                            .with_resource(item.operation.clone())
                            .with_error(e.to_string()),
                    );
                    if self.queue.record_result(&item, false).is_err() {
                        break;
                    }
                }
            }
        }

        report
    }

    /// Flip the dirty flag off on the entity a delivered queue item
    /// mirrors. The payload carries the natural key.
    fn acknowledge(&self, item: &crate::domain::QueueItem) {
        let result: Result<()> = (|| {
            match item.operation.split('.').next().unwrap_or_default() {
                "transaction" => {
                    if let Some(id) = item.payload.get("id").and_then(|v| v.as_str()) {
                        if let Ok(id) = id.parse() {
                            self.store.mark_transaction_clean(id)?;
                        }
                    }
                }
                "account" => {
                    if let Some(path) = item.payload.get("path").and_then(|v| v.as_str()) {
                        self.store.mark_account_clean(path)?;
                    }
                }
                "tag" => {
                    if let Some(id) = item.payload.get("id").and_then(|v| v.as_str()) {
                        self.store.mark_tag_clean(id)?;
                    }
                }
                "unit" => {
                    if let Some(code) = item.payload.get("code").and_then(|v| v.as_str()) {
                        self.store.mark_unit_clean(code)?;
                    }
                }
                _ => {}
            }
            Ok(())
        })();

        if let Err(e) = result {
            self.logger.log(
                LogEvent::new("push.ack_failed")
                    .with_resource(item.operation.clone())
                    .with_error(e.to_string()),
            );
        }
    }

    // === Pull ===

    /// Pull resources in the fixed dependency order. A resource failure
    /// aborts the remainder of the pull; batches already committed stay.
    fn pull_cycle(&self, scope: PullScope) -> PullReport {
        let mut report = PullReport::default();

        let resources: Vec<PullScope> = match scope {
            PullScope::Full => vec![
                PullScope::Tags,
                PullScope::Accounts,
                PullScope::Units,
                PullScope::Transactions,
                PullScope::Prices,
                PullScope::Reports,
            ],
            narrow => vec![narrow],
        };

        for resource in resources {
            let outcome = match resource {
                PullScope::Tags => self.pull_tags(),
                PullScope::Accounts => self.pull_accounts(),
                PullScope::Units => self.pull_units(),
                PullScope::Transactions => self.pull_transactions(),
                PullScope::Prices => self.pull_prices(),
                _ => self.pull_reports(),
            };

            match outcome {
                Ok(resource_report) => {
                    if resource_report.skipped_malformed > 0 {
                        self.logger.log(
                            LogEvent::new("pull.record_skipped")
                                .with_resource(resource_report.resource.clone())
                                .with_count(resource_report.skipped_malformed),
                        );
                    }
                    report.resources.push(resource_report);
                }
                Err(e) => {
                    self.logger.log(
                        LogEvent::new("pull.failed")
                            .with_resource(format!("{:?}", resource).to_lowercase())
                            .with_error(e.to_string()),
                    );
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        report
    }

    fn pull_tags(&self) -> Result<ResourcePullReport> {
        let fetched = self.gateway.list_tags()?;
        let mut report = ResourcePullReport::new("tags", fetched.skipped);
        for tag in &fetched.items {
            self.store.pull_upsert_tag(tag)?;
            report.upserted += 1;
        }
        Ok(report)
    }

    fn pull_accounts(&self) -> Result<ResourcePullReport> {
        let fetched = self.gateway.list_accounts()?;
        let mut report = ResourcePullReport::new("accounts", fetched.skipped);
        for account in &fetched.items {
            self.store.pull_upsert_account(account)?;
            report.upserted += 1;
        }
        Ok(report)
    }

    fn pull_units(&self) -> Result<ResourcePullReport> {
        let fetched = self.gateway.list_units()?;
        let mut report = ResourcePullReport::new("units", fetched.skipped);
        for unit in &fetched.items {
            self.store.pull_upsert_unit(unit)?;
            report.upserted += 1;
        }
        Ok(report)
    }

    /// Paginated transaction pull with the dirty-preserving merge rule:
    /// existing non-dirty rows only get their dirty flag confirmed off,
    /// dirty rows are left untouched entirely, absent rows are inserted
    /// with their postings. One store commit per batch.
    fn pull_transactions(&self) -> Result<ResourcePullReport> {
        let mut report = ResourcePullReport::new("transactions", 0);

        // Tag map built once per pull, not once per posting: postings
        // reference tags pulled in the earlier step
        let known_tags: HashSet<String> =
            self.store.get_tags()?.into_iter().map(|t| t.id).collect();

        let mut offset = 0i64;
        loop {
            let page = self.gateway.list_transactions(self.page_size, offset)?;
            let fetched = page.items.len();
            report.skipped_malformed += page.skipped as i64;

            for chunk in page.items.chunks(TX_BATCH_SIZE) {
                let mut inserts: Vec<Transaction> = Vec::new();
                let mut ensure_clean = Vec::new();

                for tx in chunk {
                    match self.store.get_transaction_dirty(tx.id)? {
                        // Local edit wins until it syncs out
                        Some(true) => report.skipped_dirty += 1,
                        // Already observed: never touch the body again
                        Some(false) => {
                            ensure_clean.push(tx.id);
                            report.skipped_existing += 1;
                        }
                        None => {
                            let mut tx = tx.clone();
                            tx.dirty = false;
                            for posting in &mut tx.postings {
                                posting.tag_ids.retain(|id| known_tags.contains(id));
                            }
                            inserts.push(tx);
                        }
                    }
                }

                report.upserted += inserts.len() as i64;
                self.store.apply_transaction_batch(&inserts, &ensure_clean)?;
            }

            offset += fetched as i64;
            if fetched < self.page_size as usize || fetched == 0 {
                break;
            }
        }

        Ok(report)
    }

    fn pull_prices(&self) -> Result<ResourcePullReport> {
        let fetched = self.gateway.list_prices()?;
        let mut report = ResourcePullReport::new("prices", fetched.skipped);
        for price in &fetched.items {
            self.store.upsert_price(price)?;
            report.upserted += 1;
        }
        Ok(report)
    }

    /// Server-computed report snapshots: point-in-time payloads written
    /// last-write-wins into the keyed side cache
    fn pull_reports(&self) -> Result<ResourcePullReport> {
        let mut report = ResourcePullReport::new("reports", 0);
        let year = Utc::now().year();

        let snapshots = [
            ReportSnapshot::new(ReportKind::Portfolio, "", self.gateway.get_portfolio()?),
            ReportSnapshot::new(
                ReportKind::NetWorthHistory,
                "monthly",
                self.gateway.get_net_worth_history("monthly")?,
            ),
            ReportSnapshot::new(ReportKind::TaxAnalysis, "", self.gateway.get_tax_analysis()?),
            ReportSnapshot::new(
                ReportKind::CapitalGains,
                year.to_string(),
                self.gateway.get_capital_gains(year)?,
            ),
            ReportSnapshot::new(
                ReportKind::CashFlow,
                "monthly",
                self.gateway.get_cash_flow("monthly")?,
            ),
        ];

        for snapshot in &snapshots {
            self.store.upsert_report(snapshot)?;
            report.upserted += 1;
        }

        Ok(report)
    }
}

// === Report types ===

/// Outcome of one sync cycle. `skipped` marks a single-flight no-op.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<PullReport>,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            push: None,
            pull: None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PushReport {
    pub attempted: i64,
    pub delivered: i64,
    pub failed: i64,
    pub deauthorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct PullReport {
    pub resources: Vec<ResourcePullReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResourcePullReport {
    pub resource: String,
    pub upserted: i64,
    /// Existing non-dirty rows whose bodies were left alone
    pub skipped_existing: i64,
    /// Dirty local rows the pull refused to touch
    pub skipped_dirty: i64,
    /// Remote records dropped because they failed to decode
    pub skipped_malformed: i64,
}

impl ResourcePullReport {
    fn new(resource: &str, malformed: u32) -> Self {
        Self {
            resource: resource.to_string(),
            upserted: 0,
            skipped_existing: 0,
            skipped_dirty: 0,
            skipped_malformed: malformed as i64,
        }
    }
}
