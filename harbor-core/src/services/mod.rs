//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod analytics;
mod ledger;
pub mod logging;
pub mod migration;
mod queue;
mod status;
mod sync;
pub mod xirr;

pub use analytics::{
    AnalyticsService, DateRange, FlowKind, NetWorthPoint, Summary, TagBreakdownEntry,
    TransactionProjection,
};
pub use ledger::LedgerService;
pub use logging::{LogEvent, SyncLogger};
pub use migration::{MigrationResult, MigrationService};
pub use queue::{ClearResult, QueueService};
pub use status::{StatusService, StatusSummary};
pub use sync::{PullReport, PullScope, PushReport, ResourcePullReport, SyncReport, SyncService, SyncState};
