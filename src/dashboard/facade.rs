use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;

use crate::activity::{ActivityEntry, ActivityLog};
use crate::backend::DashboardBackend;
use crate::metrics::{
    AggregationStore, BugAggregate, DataState, HealthThresholds, Period, SnapshotSeries,
    SubjectOverview, Trend,
};
use crate::notifications::{NotificationCenter, NotificationEntry};
use crate::polling::{PollStatus, PollingController};
use crate::settings::DashboardSettings;

use super::sources::{ActivitySource, BugSource, NotificationSource, QualityParams, QualitySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BugDataState {
    NoDataYet,
    /// The backend answered with zero bugs across zero features: nothing is
    /// tracked yet, which is not the same as missing data.
    NoBugsTracked,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BugOverview {
    pub state: BugDataState,
    pub aggregate: Option<BugAggregate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub state: DataState,
    pub entries: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub state: DataState,
    pub entries: Vec<NotificationEntry>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOverview {
    pub quality: PollStatus,
    pub bugs: PollStatus,
    pub activity: PollStatus,
    pub notifications: PollStatus,
}

/// Everything a dashboard render pass needs, in one read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub subjects: Vec<SubjectOverview>,
    pub bugs: BugOverview,
    pub activity: ActivityView,
    pub notifications: NotificationView,
    pub polls: PollOverview,
}

/// Owns the stores and their polling loops and composes their outputs into
/// the shape the presentation layer consumes. The facade only reads from the
/// stores it created; all writes flow through the poll sources.
pub struct Dashboard {
    backend: Arc<dyn DashboardBackend>,
    store: AggregationStore,
    activity: ActivityLog,
    notifications: NotificationCenter,
    quality_poller: PollingController<QualitySource>,
    bugs_poller: PollingController<BugSource>,
    activity_poller: PollingController<ActivitySource>,
    notification_poller: PollingController<NotificationSource>,
    settings: DashboardSettings,
    thresholds: HealthThresholds,
}

impl Dashboard {
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        subjects: Vec<String>,
        settings: DashboardSettings,
    ) -> Self {
        let store = AggregationStore::new();
        let activity = ActivityLog::new();
        let notifications = NotificationCenter::new();

        let quality_poller = PollingController::new(
            Arc::new(QualitySource::new(Arc::clone(&backend), store.clone())),
            QualityParams {
                subjects,
                period: settings.default_period,
            },
        );
        let bugs_poller = PollingController::new(
            Arc::new(BugSource::new(Arc::clone(&backend), store.clone())),
            settings.default_period,
        );
        let activity_poller = PollingController::new(
            Arc::new(ActivitySource::new(Arc::clone(&backend), activity.clone())),
            (),
        );
        let notification_poller = PollingController::new(
            Arc::new(NotificationSource::new(
                Arc::clone(&backend),
                notifications.clone(),
            )),
            (),
        );

        Self {
            backend,
            store,
            activity,
            notifications,
            quality_poller,
            bugs_poller,
            activity_poller,
            notification_poller,
            settings,
            thresholds: HealthThresholds::default(),
        }
    }

    /// Start every polling loop at its configured cadence. Each family is an
    /// independent timeline; none of them share ordering.
    pub fn start(&mut self) -> Result<()> {
        let intervals = &self.settings.intervals;
        self.quality_poller
            .start(Duration::from_secs(intervals.quality_secs))?;
        self.bugs_poller
            .start(Duration::from_secs(intervals.bugs_secs))?;
        self.activity_poller
            .start(Duration::from_secs(intervals.activity_secs))?;
        self.notification_poller
            .start(Duration::from_secs(intervals.notifications_secs))?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.quality_poller.stop().await?;
        self.bugs_poller.stop().await?;
        self.activity_poller.stop().await?;
        self.notification_poller.stop().await?;
        Ok(())
    }

    /// Force an immediate refresh of every family.
    pub fn refresh_all(&self) {
        self.quality_poller.refresh_now();
        self.bugs_poller.refresh_now();
        self.activity_poller.refresh_now();
        self.notification_poller.refresh_now();
    }

    /// Switch the active time range. Pending fetches for the old range are
    /// superseded; their results will be discarded when they resolve.
    pub fn set_time_range(&self, period: Period) {
        let mut params = self.quality_poller.current_params();
        params.period = period;
        self.quality_poller.reconfigure(params);
        self.bugs_poller.reconfigure(period);
    }

    /// Replace the subject roster the quality poll covers.
    pub fn set_subjects(&self, subjects: Vec<String>) {
        let mut params = self.quality_poller.current_params();
        params.subjects = subjects;
        self.quality_poller.reconfigure(params);
    }

    /// Mark a notification read: locally at once, upstream fire-and-forget.
    /// Local read state is not rolled back if the upstream call fails.
    pub async fn mark_notification_read(&self, id: &str) {
        self.notifications.mark_read(id).await;

        let backend = Arc::clone(&self.backend);
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(err) = backend.mark_notification_read(id.clone()).await {
                warn!("mark-read for {} failed upstream: {:#}", id, err);
            }
        });
    }

    pub async fn mark_all_notifications_read(&self) {
        let flipped = self.notifications.mark_all_read().await;
        for id in flipped {
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(err) = backend.mark_notification_read(id.clone()).await {
                    warn!("mark-read for {} failed upstream: {:#}", id, err);
                }
            });
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let params = self.quality_poller.current_params();

        let mut subjects = Vec::with_capacity(params.subjects.len());
        for subject_id in &params.subjects {
            let overview = self
                .store
                .overview(
                    subject_id,
                    self.settings.target_feedback_rate,
                    &self.thresholds,
                )
                .await
                .unwrap_or_else(|| never_polled_overview(subject_id, params.period));
            subjects.push(overview);
        }

        let bugs = match self.store.aggregate().await {
            None => BugOverview {
                state: BugDataState::NoDataYet,
                aggregate: None,
            },
            Some(aggregate) if aggregate.is_untracked() => BugOverview {
                state: BugDataState::NoBugsTracked,
                aggregate: Some(aggregate),
            },
            Some(aggregate) => BugOverview {
                state: BugDataState::Ready,
                aggregate: Some(aggregate),
            },
        };

        DashboardSnapshot {
            generated_at: Utc::now(),
            period: params.period,
            subjects,
            bugs,
            activity: ActivityView {
                state: self.activity.state().await,
                entries: self.activity.entries().await,
            },
            notifications: NotificationView {
                state: self.notifications.state().await,
                entries: self.notifications.entries().await,
                unread_count: self.notifications.unread_count().await,
            },
            polls: PollOverview {
                quality: self.quality_poller.status(),
                bugs: self.bugs_poller.status(),
                activity: self.activity_poller.status(),
                notifications: self.notification_poller.status(),
            },
        }
    }

    pub fn store(&self) -> AggregationStore {
        self.store.clone()
    }

    pub fn activity_log(&self) -> ActivityLog {
        self.activity.clone()
    }

    pub fn notification_center(&self) -> NotificationCenter {
        self.notifications.clone()
    }
}

fn never_polled_overview(subject_id: &str, period: Period) -> SubjectOverview {
    SubjectOverview {
        subject_id: subject_id.to_string(),
        state: DataState::NoDataYet,
        series: SnapshotSeries::new(subject_id.to_string(), period, Vec::new()),
        trend: Trend::insufficient_data(),
        rate: crate::metrics::Rate::insufficient(),
        health: None,
        breakdown: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityStatus;
    use crate::backend::types::{AggregateQuery, SnapshotQuery, SnapshotResponse};
    use crate::backend::MockBackend;
    use anyhow::anyhow;
    use futures::future::BoxFuture;
    use tokio::time::sleep;

    fn test_settings() -> DashboardSettings {
        DashboardSettings::default()
    }

    #[tokio::test]
    async fn snapshot_composes_all_families_from_mock_backend() {
        let _ = env_logger::builder().is_test(true).try_init();

        let backend = Arc::new(MockBackend::with_seed(11));
        let mut dashboard = Dashboard::new(
            backend,
            vec!["repo-a".to_string(), "repo-b".to_string()],
            test_settings(),
        );
        dashboard.start().unwrap();
        // Initial fetches fire immediately; give them a moment to land.
        sleep(Duration::from_millis(100)).await;

        let snapshot = dashboard.snapshot().await;
        assert_eq!(snapshot.subjects.len(), 2);
        assert!(snapshot
            .subjects
            .iter()
            .all(|s| s.state == DataState::Ready));
        assert_ne!(snapshot.bugs.state, BugDataState::NoDataYet);
        assert_eq!(snapshot.activity.state, DataState::Ready);
        assert_eq!(snapshot.notifications.state, DataState::Ready);
        assert_eq!(
            snapshot.notifications.unread_count,
            snapshot.notifications.entries.len()
        );
        assert!(snapshot.polls.quality.last_success_at.is_some());

        dashboard.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_subject_renders_as_no_data_yet() {
        let backend = Arc::new(MockBackend::with_seed(11));
        let dashboard = Dashboard::new(backend, vec!["repo-a".to_string()], test_settings());

        // Never started, so nothing was ever polled.
        let snapshot = dashboard.snapshot().await;
        assert_eq!(snapshot.subjects.len(), 1);
        assert_eq!(snapshot.subjects[0].state, DataState::NoDataYet);
        assert_eq!(snapshot.bugs.state, BugDataState::NoDataYet);
    }

    /// Backend whose mutations always fail, for pinning the optimistic
    /// mark-read policy.
    struct ReadOnlyBackend {
        inner: MockBackend,
    }

    impl DashboardBackend for ReadOnlyBackend {
        fn fetch_snapshots(
            &self,
            query: SnapshotQuery,
        ) -> BoxFuture<'_, anyhow::Result<SnapshotResponse>> {
            self.inner.fetch_snapshots(query)
        }

        fn fetch_aggregate(
            &self,
            query: AggregateQuery,
        ) -> BoxFuture<'_, anyhow::Result<BugAggregate>> {
            self.inner.fetch_aggregate(query)
        }

        fn fetch_activities(&self) -> BoxFuture<'_, anyhow::Result<Vec<ActivityEntry>>> {
            self.inner.fetch_activities()
        }

        fn fetch_notifications(&self) -> BoxFuture<'_, anyhow::Result<Vec<NotificationEntry>>> {
            self.inner.fetch_notifications()
        }

        fn mark_notification_read(&self, _id: String) -> BoxFuture<'_, anyhow::Result<()>> {
            Box::pin(async { Err(anyhow!("503 service unavailable")) })
        }
    }

    #[tokio::test]
    async fn mark_read_is_optimistic_and_not_rolled_back_on_failure() {
        let backend = Arc::new(ReadOnlyBackend {
            inner: MockBackend::with_seed(3),
        });
        let dashboard = Dashboard::new(backend, vec!["repo-a".to_string()], test_settings());

        dashboard
            .notification_center()
            .ingest(vec![NotificationEntry {
                entry: ActivityEntry {
                    id: "n1".to_string(),
                    timestamp: Utc::now(),
                    category: "violation".to_string(),
                    subject: "repo-a".to_string(),
                    message: "rule blocked a commit".to_string(),
                    status: ActivityStatus::Warning,
                    detail: None,
                },
                read: false,
                action_ref: None,
            }])
            .await;

        dashboard.mark_notification_read("n1").await;
        // Let the fire-and-forget upstream call fail.
        sleep(Duration::from_millis(50)).await;

        let snapshot = dashboard.snapshot().await;
        assert_eq!(snapshot.notifications.unread_count, 0);
        assert!(snapshot.notifications.entries[0].read);
    }

    #[tokio::test]
    async fn set_time_range_updates_both_metric_pollers() {
        let backend = Arc::new(MockBackend::with_seed(5));
        let dashboard = Dashboard::new(backend, vec!["repo-a".to_string()], test_settings());

        dashboard.set_time_range(Period::Week);
        assert_eq!(dashboard.quality_poller.current_params().period, Period::Week);
        assert_eq!(dashboard.bugs_poller.current_params(), Period::Week);
    }
}
