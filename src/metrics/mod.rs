pub mod config;
pub mod store;
pub mod trend;
pub mod types;

pub use config::{HealthThresholds, TrendConfig};
pub use store::{AggregationStore, SubjectOverview};
pub use trend::{classify, health_bucket};
pub use types::{
    BugAggregate, CategoryBreakdown, DataState, FeatureBugCount, FeedbackCounts, HealthBucket,
    MetricSnapshot, Period, Rate, RatePoint, SnapshotSeries, Trend, TrendDirection,
};
