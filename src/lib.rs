pub mod activity;
pub mod backend;
pub mod dashboard;
pub mod metrics;
pub mod notifications;
pub mod polling;
pub mod settings;

pub use activity::{ActivityEntry, ActivityLog, ActivityStatus, CATEGORY_ALL};
pub use backend::{DashboardBackend, HttpBackend, HttpBackendConfig, MockBackend};
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use metrics::{
    AggregationStore, BugAggregate, CategoryBreakdown, DataState, HealthBucket, HealthThresholds,
    MetricSnapshot, Period, Rate, SnapshotSeries, Trend, TrendConfig, TrendDirection,
};
pub use notifications::{NotificationCenter, NotificationEntry};
pub use polling::{PollSource, PollStatus, PollingController};
pub use settings::{DashboardSettings, SettingsStore};
