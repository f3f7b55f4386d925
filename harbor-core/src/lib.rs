//! Harbor Core - offline-first sync engine and analytics for a personal ledger
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transaction, Tag, Unit, ...)
//! - **ports**: Trait definitions for external collaborators (RemoteGateway, AuthProvider)
//! - **services**: Business logic orchestration (sync, queue, analytics, XIRR)
//! - **adapters**: Concrete implementations (DuckDB store, HTTP and demo gateways)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbStore;
use config::Config;
use ports::{AuthProvider, ConnectivityProvider, RemoteGateway};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Account, AccountCategory, MetaValue, Posting, Price, QueueItem, QueueStatus, Tag, Transaction,
    Unit,
};

/// Main context for Harbor operations
///
/// This is the primary entry point for all business logic. It holds the
/// store, configuration, and all services. The gateway and the auth and
/// connectivity collaborators are injected by the surrounding app.
pub struct HarborContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub ledger_service: LedgerService,
    pub sync_service: SyncService,
    pub analytics_service: Arc<AnalyticsService>,
    pub queue_service: QueueService,
    pub status_service: StatusService,
}

impl HarborContext {
    /// Create a new Harbor context
    pub fn new(
        harbor_dir: &Path,
        gateway: Arc<dyn RemoteGateway>,
        auth: Arc<dyn AuthProvider>,
        connectivity: Arc<dyn ConnectivityProvider>,
    ) -> Result<Self> {
        let config = Config::load(harbor_dir)?;

        // Demo mode gets its own database file
        let db_filename = if config.demo_mode {
            "demo.duckdb"
        } else {
            "harbor.duckdb"
        };

        let db_path = harbor_dir.join(db_filename);
        let store = Arc::new(DuckDbStore::new(&db_path)?);

        // Initialize schema
        store.ensure_schema()?;

        // Create services
        let analytics_service = Arc::new(AnalyticsService::new(
            Arc::clone(&store),
            config.fiscal_year_start_month,
        ));
        let ledger_service =
            LedgerService::new(Arc::clone(&store), Arc::clone(&analytics_service));
        let sync_service = SyncService::new(
            Arc::clone(&store),
            gateway,
            auth,
            connectivity,
            Arc::clone(&analytics_service),
            config.page_size,
        );
        let queue_service = QueueService::new(Arc::clone(&store));
        let status_service = StatusService::new(Arc::clone(&store));

        Ok(Self {
            config,
            store,
            ledger_service,
            sync_service,
            analytics_service,
            queue_service,
            status_service,
        })
    }

    /// Debug escape hatch: wipe the local replica entirely. The next sync
    /// repopulates it from the server.
    pub fn clear_all_local_data(&self) -> Result<()> {
        self.store.clear_all_local_data()?;
        self.analytics_service.invalidate();
        Ok(())
    }
}
