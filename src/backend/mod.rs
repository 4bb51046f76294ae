pub mod http;
pub mod mock;
pub mod types;

pub use http::{HttpBackend, HttpBackendConfig};
pub use mock::MockBackend;
pub use types::{AggregateQuery, SnapshotPoint, SnapshotQuery, SnapshotResponse};

use anyhow::Result;
use futures::future::BoxFuture;

use crate::activity::ActivityEntry;
use crate::metrics::BugAggregate;
use crate::notifications::NotificationEntry;

/// The backend collaborator the engine polls. Implementations are the live
/// HTTP client and the mock generator; tests supply their own.
///
/// Object-safe so stores and pollers can share one `Arc<dyn DashboardBackend>`
/// regardless of which implementation is active.
pub trait DashboardBackend: Send + Sync {
    fn fetch_snapshots(&self, query: SnapshotQuery) -> BoxFuture<'_, Result<SnapshotResponse>>;

    fn fetch_aggregate(&self, query: AggregateQuery) -> BoxFuture<'_, Result<BugAggregate>>;

    fn fetch_activities(&self) -> BoxFuture<'_, Result<Vec<ActivityEntry>>>;

    fn fetch_notifications(&self) -> BoxFuture<'_, Result<Vec<NotificationEntry>>>;

    /// Mark a notification read upstream. Callers treat this as
    /// fire-and-forget; local read state is not rolled back on failure.
    fn mark_notification_read(&self, id: String) -> BoxFuture<'_, Result<()>>;
}
