use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::metrics::config::{HealthThresholds, TrendConfig};
use crate::metrics::trend::{classify, health_bucket};
use crate::metrics::types::{
    BugAggregate, CategoryBreakdown, DataState, FeedbackCounts, HealthBucket, MetricSnapshot,
    Period, Rate, SnapshotSeries, Trend,
};

/// Holds the latest snapshot series, category breakdown and feedback counters
/// per subject, plus the aggregate bug metrics for the active time range.
///
/// Every ingest replaces the prior data wholesale; nothing is merged
/// incrementally, so re-ingesting an identical response is a no-op in effect.
pub struct AggregationStore {
    inner: Arc<Mutex<StoreState>>,
}

struct StoreState {
    subjects: HashMap<String, SubjectState>,
    aggregate: Option<BugAggregate>,
    trend_config: TrendConfig,
}

struct SubjectState {
    series: SnapshotSeries,
    trend: Trend,
    breakdown: CategoryBreakdown,
    feedback: Option<FeedbackCounts>,
}

/// Everything the presentation layer needs for one subject card.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOverview {
    pub subject_id: String,
    pub state: DataState,
    pub series: SnapshotSeries,
    pub trend: Trend,
    pub rate: Rate,
    pub health: Option<HealthBucket>,
    pub breakdown: CategoryBreakdown,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::with_config(TrendConfig::default())
    }

    pub fn with_config(trend_config: TrendConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreState {
                subjects: HashMap::new(),
                aggregate: None,
                trend_config,
            })),
        }
    }

    /// Replace the series for a subject. Snapshots are re-sorted by timestamp
    /// before storing, so a partially ordered backend page cannot corrupt the
    /// series invariant. When the backend supplied a precomputed trend it is
    /// trusted as-is; otherwise the trend is derived locally.
    pub async fn ingest_series(
        &self,
        subject_id: &str,
        period: Period,
        snapshots: Vec<MetricSnapshot>,
        precomputed_trend: Option<Trend>,
        higher_is_better: bool,
    ) {
        let mut state = self.inner.lock().await;
        let series = SnapshotSeries::new(subject_id.to_string(), period, snapshots);
        let trend = precomputed_trend
            .unwrap_or_else(|| classify(&series, higher_is_better, &state.trend_config));

        match state.subjects.get_mut(subject_id) {
            Some(subject) => {
                subject.series = series;
                subject.trend = trend;
            }
            None => {
                state.subjects.insert(
                    subject_id.to_string(),
                    SubjectState {
                        series,
                        trend,
                        breakdown: CategoryBreakdown::new(),
                        feedback: None,
                    },
                );
            }
        }
    }

    /// Replace the category breakdown for a subject. Categories absent from
    /// the latest response are dropped, never carried over.
    pub async fn ingest_breakdown(&self, subject_id: &str, breakdown: CategoryBreakdown) {
        let mut state = self.inner.lock().await;
        state.entry_for(subject_id).breakdown = breakdown;
    }

    pub async fn ingest_feedback(&self, subject_id: &str, counts: FeedbackCounts) {
        let mut state = self.inner.lock().await;
        state.entry_for(subject_id).feedback = Some(counts);
    }

    /// Replace the aggregate bug metrics for the active time range.
    pub async fn ingest_aggregate(&self, aggregate: BugAggregate) {
        let mut state = self.inner.lock().await;
        state.aggregate = Some(aggregate);
    }

    pub async fn series(&self, subject_id: &str) -> Option<SnapshotSeries> {
        let state = self.inner.lock().await;
        state.subjects.get(subject_id).map(|s| s.series.clone())
    }

    pub async fn trend(&self, subject_id: &str) -> Option<Trend> {
        let state = self.inner.lock().await;
        state.subjects.get(subject_id).map(|s| s.trend)
    }

    pub async fn breakdown(&self, subject_id: &str) -> Option<CategoryBreakdown> {
        let state = self.inner.lock().await;
        state.subjects.get(subject_id).map(|s| s.breakdown.clone())
    }

    /// Feedback coverage as a soft-failing ratio. Unknown subjects and zero
    /// denominators both report `insufficient_sample` instead of erroring.
    pub async fn rate(&self, subject_id: &str) -> Rate {
        let state = self.inner.lock().await;
        state
            .subjects
            .get(subject_id)
            .and_then(|s| s.feedback)
            .map(|counts| counts.rate())
            .unwrap_or_else(Rate::insufficient)
    }

    pub async fn aggregate(&self) -> Option<BugAggregate> {
        let state = self.inner.lock().await;
        state.aggregate.clone()
    }

    pub async fn subject_ids(&self) -> Vec<String> {
        let state = self.inner.lock().await;
        state.subjects.keys().cloned().collect()
    }

    /// Compose the per-subject view: series, trend, rate and the health
    /// bucket for the given target rate. Returns `None` when the subject was
    /// never populated, so callers can render a "no data yet" state.
    pub async fn overview(
        &self,
        subject_id: &str,
        target_rate: f64,
        thresholds: &HealthThresholds,
    ) -> Option<SubjectOverview> {
        let state = self.inner.lock().await;
        let subject = state.subjects.get(subject_id)?;

        let rate = subject
            .feedback
            .map(|counts| counts.rate())
            .unwrap_or_else(Rate::insufficient);
        let health = if rate.insufficient_sample {
            None
        } else {
            Some(health_bucket(rate.value, target_rate, thresholds))
        };
        let data_state = if subject.series.is_empty() {
            DataState::Empty
        } else {
            DataState::Ready
        };

        Some(SubjectOverview {
            subject_id: subject_id.to_string(),
            state: data_state,
            series: subject.series.clone(),
            trend: subject.trend,
            rate,
            health,
            breakdown: subject.breakdown.clone(),
        })
    }
}

impl StoreState {
    fn entry_for(&mut self, subject_id: &str) -> &mut SubjectState {
        self.subjects
            .entry(subject_id.to_string())
            .or_insert_with(|| SubjectState {
                series: SnapshotSeries::new(subject_id.to_string(), Period::default(), Vec::new()),
                trend: Trend::insufficient_data(),
                breakdown: CategoryBreakdown::new(),
                feedback: None,
            })
    }
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AggregationStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::TrendDirection;
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot(offset_mins: i64, value: f64) -> MetricSnapshot {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        MetricSnapshot {
            timestamp: base + Duration::minutes(offset_mins),
            value,
            secondary_value: None,
        }
    }

    #[tokio::test]
    async fn ingest_resorts_out_of_order_snapshots() {
        let store = AggregationStore::new();
        store
            .ingest_series(
                "repo-a",
                Period::Week,
                vec![snapshot(30, 70.0), snapshot(0, 80.0), snapshot(10, 75.0)],
                None,
                true,
            )
            .await;

        let series = store.series("repo-a").await.unwrap();
        let values: Vec<f64> = series.snapshots.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![80.0, 75.0, 70.0]);

        // First-to-last delta is computed over the sorted order.
        let trend = store.trend("repo-a").await.unwrap();
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.change, -10.0);
    }

    #[tokio::test]
    async fn reingesting_identical_input_is_idempotent() {
        let store = AggregationStore::new();
        let snapshots = vec![snapshot(0, 80.0), snapshot(10, 90.0)];
        store
            .ingest_series("repo-a", Period::Week, snapshots.clone(), None, true)
            .await;
        let first = store.series("repo-a").await.unwrap();

        store
            .ingest_series("repo-a", Period::Week, snapshots, None, true)
            .await;
        let second = store.series("repo-a").await.unwrap();

        assert_eq!(first.snapshots, second.snapshots);
        assert_eq!(
            store.trend("repo-a").await.unwrap().direction,
            TrendDirection::Improving
        );
    }

    #[tokio::test]
    async fn precomputed_trend_is_trusted_over_local_classification() {
        let store = AggregationStore::new();
        let backend_trend = Trend {
            direction: TrendDirection::Stable,
            change: 0.5,
            change_percent: Some(0.6),
        };
        // Raw values would classify as improving; the backend's verdict wins.
        store
            .ingest_series(
                "repo-a",
                Period::Week,
                vec![snapshot(0, 50.0), snapshot(10, 90.0)],
                Some(backend_trend),
                true,
            )
            .await;

        assert_eq!(store.trend("repo-a").await.unwrap(), backend_trend);
    }

    #[tokio::test]
    async fn rate_fails_softly_without_samples() {
        let store = AggregationStore::new();
        assert!(store.rate("unknown").await.insufficient_sample);

        store
            .ingest_feedback(
                "repo-a",
                FeedbackCounts {
                    with_feedback: 0,
                    total_predictions: 0,
                },
            )
            .await;
        let rate = store.rate("repo-a").await;
        assert_eq!(rate.value, 0.0);
        assert!(rate.insufficient_sample);

        store
            .ingest_feedback(
                "repo-a",
                FeedbackCounts {
                    with_feedback: 30,
                    total_predictions: 100,
                },
            )
            .await;
        let rate = store.rate("repo-a").await;
        assert_eq!(rate.value, 0.3);
        assert!(!rate.insufficient_sample);
    }

    #[tokio::test]
    async fn breakdown_replacement_drops_stale_categories() {
        let store = AggregationStore::new();
        let mut first = CategoryBreakdown::new();
        first.insert("syntax".to_string(), 4);
        first.insert("logic".to_string(), 2);
        store.ingest_breakdown("repo-a", first).await;

        let mut second = CategoryBreakdown::new();
        second.insert("security".to_string(), 1);
        store.ingest_breakdown("repo-a", second).await;

        let breakdown = store.breakdown("repo-a").await.unwrap();
        assert_eq!(breakdown.get("security"), Some(&1));
        assert!(!breakdown.contains_key("syntax"));
        assert!(!breakdown.contains_key("logic"));
    }

    #[tokio::test]
    async fn overview_distinguishes_missing_empty_and_ready() {
        let store = AggregationStore::new();
        let thresholds = HealthThresholds::default();

        assert!(store.overview("never-seen", 0.3, &thresholds).await.is_none());

        store
            .ingest_series("repo-a", Period::Week, Vec::new(), None, true)
            .await;
        let overview = store.overview("repo-a", 0.3, &thresholds).await.unwrap();
        assert_eq!(overview.state, DataState::Empty);
        assert_eq!(overview.trend.direction, TrendDirection::InsufficientData);
        // No samples yet, so no health verdict either.
        assert!(overview.health.is_none());

        store
            .ingest_series(
                "repo-a",
                Period::Week,
                vec![snapshot(0, 80.0), snapshot(10, 90.0)],
                None,
                true,
            )
            .await;
        store
            .ingest_feedback(
                "repo-a",
                FeedbackCounts {
                    with_feedback: 30,
                    total_predictions: 100,
                },
            )
            .await;
        let overview = store.overview("repo-a", 0.3, &thresholds).await.unwrap();
        assert_eq!(overview.state, DataState::Ready);
        assert_eq!(overview.health, Some(HealthBucket::Healthy));
    }

    #[tokio::test]
    async fn aggregate_is_replaced_wholesale() {
        let store = AggregationStore::new();
        assert!(store.aggregate().await.is_none());

        store
            .ingest_aggregate(BugAggregate {
                total: 12,
                by_feature: vec![],
                by_category: CategoryBreakdown::new(),
                trends: vec![],
                average_rate: 0.4,
            })
            .await;
        assert_eq!(store.aggregate().await.unwrap().total, 12);

        store
            .ingest_aggregate(BugAggregate {
                total: 0,
                by_feature: vec![],
                by_category: CategoryBreakdown::new(),
                trends: vec![],
                average_rate: 0.0,
            })
            .await;
        let aggregate = store.aggregate().await.unwrap();
        assert!(aggregate.is_untracked());
    }
}
