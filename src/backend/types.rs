use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{CategoryBreakdown, FeedbackCounts, Period, Trend};

/// Query for one subject's snapshot series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    pub subject_id: String,
    pub period: Period,
}

/// One raw point from the snapshot endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPoint {
    pub timestamp: DateTime<Utc>,
    pub quality_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_file_score: Option<f64>,
}

/// Snapshot endpoint response. `trend` is the backend's own verdict and is
/// trusted when present; the breakdown and feedback blocks ride along so one
/// poll fills the whole subject card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    #[serde(default)]
    pub snapshots: Vec<SnapshotPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_category: Option<CategoryBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackCounts>,
}

/// Query for the aggregate bug metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    pub time_range: Period,
}
