use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One timestamped observation of a metric for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    Custom { days: u32 },
}

impl Period {
    pub fn days(&self) -> u32 {
        match self {
            Period::Day => 1,
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Custom { days } => *days,
        }
    }

    /// Value used in backend query strings, e.g. `?period=7d`.
    pub fn query_value(&self) -> String {
        match self {
            Period::Day => "24h".to_string(),
            Period::Week => "7d".to_string(),
            Period::Month => "30d".to_string(),
            Period::Quarter => "90d".to_string(),
            Period::Custom { days } => format!("{}d", days),
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Month
    }
}

/// Ordered run of snapshots for one subject over one period.
/// `snapshots` is kept non-decreasing in timestamp; equal timestamps are
/// allowed and the later arrival supersedes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSeries {
    pub subject_id: String,
    pub period: Period,
    pub snapshots: Vec<MetricSnapshot>,
}

impl SnapshotSeries {
    pub fn new(subject_id: String, period: Period, mut snapshots: Vec<MetricSnapshot>) -> Self {
        // Backend pages can arrive partially ordered; a stable sort keeps
        // equal-timestamp duplicates in arrival order.
        snapshots.sort_by_key(|s| s.timestamp);
        Self {
            subject_id,
            period,
            snapshots,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficientData",
        }
    }
}

/// Derived direction and magnitude of change across a series. Never mutated
/// in place; recomputed when the owning series is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub direction: TrendDirection,
    pub change: f64,
    pub change_percent: Option<f64>,
}

impl Trend {
    pub fn insufficient_data() -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            change: 0.0,
            change_percent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthBucket {
    Healthy,
    NeedsAttention,
    Critical,
}

impl HealthBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthBucket::Healthy => "healthy",
            HealthBucket::NeedsAttention => "needsAttention",
            HealthBucket::Critical => "critical",
        }
    }
}

/// Counts per category key. Keys are an open vocabulary (syntax, logic,
/// performance, security, per-feature names, ...); unknown keys pass through.
pub type CategoryBreakdown = BTreeMap<String, u64>;

/// A ratio that fails softly: a zero denominator yields `0.0` with the
/// `insufficient_sample` flag raised instead of a division error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub value: f64,
    pub insufficient_sample: bool,
}

impl Rate {
    pub fn insufficient() -> Self {
        Self {
            value: 0.0,
            insufficient_sample: true,
        }
    }
}

/// Feedback coverage counters for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackCounts {
    pub with_feedback: u64,
    pub total_predictions: u64,
}

impl FeedbackCounts {
    pub fn rate(&self) -> Rate {
        if self.total_predictions == 0 {
            return Rate::insufficient();
        }
        Rate {
            value: self.with_feedback as f64 / self.total_predictions as f64,
            insufficient_sample: false,
        }
    }
}

/// Per-feature bug tally from the aggregate metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBugCount {
    pub feature: String,
    pub bugs: u64,
    pub rate: f64,
}

/// One point of the aggregate bug-rate trend line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePoint {
    pub date: DateTime<Utc>,
    pub count: u64,
    pub rate: f64,
}

/// Aggregate bug metrics for a time range, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugAggregate {
    pub total: u64,
    #[serde(default)]
    pub by_feature: Vec<FeatureBugCount>,
    #[serde(default)]
    pub by_category: CategoryBreakdown,
    #[serde(default)]
    pub trends: Vec<RatePoint>,
    #[serde(default)]
    pub average_rate: f64,
}

impl BugAggregate {
    /// Zero bugs across zero features is a real state ("no bugs tracked"),
    /// distinct from data that never arrived.
    pub fn is_untracked(&self) -> bool {
        self.total == 0 && self.by_feature.is_empty()
    }
}

/// Distinguishes a view that never received data from one whose latest
/// response was legitimately empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataState {
    NoDataYet,
    Empty,
    Ready,
}
