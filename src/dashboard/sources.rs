use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::activity::{ActivityEntry, ActivityLog};
use crate::backend::{AggregateQuery, DashboardBackend, SnapshotQuery, SnapshotResponse};
use crate::metrics::{AggregationStore, BugAggregate, MetricSnapshot, Period};
use crate::notifications::{NotificationCenter, NotificationEntry};
use crate::polling::PollSource;

/// Parameters for the per-subject quality snapshot poll.
#[derive(Debug, Clone)]
pub struct QualityParams {
    pub subjects: Vec<String>,
    pub period: Period,
}

/// Polls the snapshot endpoint for every subject on the roster and lands the
/// series, breakdowns and feedback counters in the aggregation store.
pub struct QualitySource {
    backend: Arc<dyn DashboardBackend>,
    store: AggregationStore,
}

impl QualitySource {
    pub fn new(backend: Arc<dyn DashboardBackend>, store: AggregationStore) -> Self {
        Self { backend, store }
    }
}

impl PollSource for QualitySource {
    type Params = QualityParams;
    type Payload = Vec<(String, SnapshotResponse)>;

    fn name(&self) -> &'static str {
        "quality metrics"
    }

    fn fetch(&self, params: QualityParams) -> BoxFuture<'_, Result<Self::Payload>> {
        Box::pin(async move {
            let mut pages = Vec::with_capacity(params.subjects.len());
            for subject_id in &params.subjects {
                let response = self
                    .backend
                    .fetch_snapshots(SnapshotQuery {
                        subject_id: subject_id.clone(),
                        period: params.period,
                    })
                    .await?;
                pages.push((subject_id.clone(), response));
            }
            Ok(pages)
        })
    }

    fn apply(&self, params: &QualityParams, payload: Self::Payload) -> BoxFuture<'_, ()> {
        let period = params.period;
        Box::pin(async move {
            for (subject_id, response) in payload {
                let snapshots: Vec<MetricSnapshot> = response
                    .snapshots
                    .into_iter()
                    .map(|point| MetricSnapshot {
                        timestamp: point.timestamp,
                        value: point.quality_score,
                        secondary_value: point.average_file_score,
                    })
                    .collect();

                // Quality scores: higher is better.
                self.store
                    .ingest_series(&subject_id, period, snapshots, response.trend, true)
                    .await;
                if let Some(breakdown) = response.by_category {
                    self.store.ingest_breakdown(&subject_id, breakdown).await;
                }
                if let Some(feedback) = response.feedback {
                    self.store.ingest_feedback(&subject_id, feedback).await;
                }
            }
        })
    }
}

/// Polls the aggregate bug metrics for the active time range.
pub struct BugSource {
    backend: Arc<dyn DashboardBackend>,
    store: AggregationStore,
}

impl BugSource {
    pub fn new(backend: Arc<dyn DashboardBackend>, store: AggregationStore) -> Self {
        Self { backend, store }
    }
}

impl PollSource for BugSource {
    type Params = Period;
    type Payload = BugAggregate;

    fn name(&self) -> &'static str {
        "bug metrics"
    }

    fn fetch(&self, time_range: Period) -> BoxFuture<'_, Result<BugAggregate>> {
        Box::pin(async move { self.backend.fetch_aggregate(AggregateQuery { time_range }).await })
    }

    fn apply(&self, _params: &Period, payload: BugAggregate) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.store.ingest_aggregate(payload).await })
    }
}

/// Polls the activity feed.
pub struct ActivitySource {
    backend: Arc<dyn DashboardBackend>,
    log: ActivityLog,
}

impl ActivitySource {
    pub fn new(backend: Arc<dyn DashboardBackend>, log: ActivityLog) -> Self {
        Self { backend, log }
    }
}

impl PollSource for ActivitySource {
    type Params = ();
    type Payload = Vec<ActivityEntry>;

    fn name(&self) -> &'static str {
        "activity feed"
    }

    fn fetch(&self, _params: ()) -> BoxFuture<'_, Result<Vec<ActivityEntry>>> {
        Box::pin(async move { self.backend.fetch_activities().await })
    }

    fn apply(&self, _params: &(), payload: Vec<ActivityEntry>) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.log.ingest(payload).await })
    }
}

/// Polls the notification stream; read-state reconciliation happens in the
/// center itself.
pub struct NotificationSource {
    backend: Arc<dyn DashboardBackend>,
    center: NotificationCenter,
}

impl NotificationSource {
    pub fn new(backend: Arc<dyn DashboardBackend>, center: NotificationCenter) -> Self {
        Self { backend, center }
    }
}

impl PollSource for NotificationSource {
    type Params = ();
    type Payload = Vec<NotificationEntry>;

    fn name(&self) -> &'static str {
        "notifications"
    }

    fn fetch(&self, _params: ()) -> BoxFuture<'_, Result<Vec<NotificationEntry>>> {
        Box::pin(async move { self.backend.fetch_notifications().await })
    }

    fn apply(&self, _params: &(), payload: Vec<NotificationEntry>) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.center.ingest(payload).await })
    }
}
