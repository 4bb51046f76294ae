use anyhow::Result;
use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use uuid::Uuid;

use crate::activity::{ActivityEntry, ActivityStatus};
use crate::backend::types::{AggregateQuery, SnapshotPoint, SnapshotQuery, SnapshotResponse};
use crate::backend::DashboardBackend;
use crate::metrics::{
    BugAggregate, CategoryBreakdown, FeatureBugCount, FeedbackCounts, RatePoint,
};
use crate::notifications::NotificationEntry;

const ACTIVITY_CATEGORIES: &[(&str, ActivityStatus)] = &[
    ("refactor", ActivityStatus::Success),
    ("violation", ActivityStatus::Warning),
    ("test", ActivityStatus::Success),
    ("test", ActivityStatus::Error),
    ("plugin_update", ActivityStatus::Info),
];

const BUG_CATEGORIES: &[&str] = &["syntax", "logic", "performance", "security", "other"];

/// Stand-in backend that generates plausible data locally, used while the
/// real service is unreachable and by the demo views.
pub struct MockBackend {
    rng: Mutex<StdRng>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Seeded variant so tests get a reproducible stream.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn snapshot_response(&self, query: &SnapshotQuery) -> SnapshotResponse {
        let mut rng = self.rng.lock().unwrap();
        let days = query.period.days() as i64;
        let now = Utc::now();

        // Quality score drifting around a subject-ish baseline.
        let mut score: f64 = rng.gen_range(55.0..90.0);
        let snapshots = (0..days.max(2))
            .map(|i| {
                score = (score + rng.gen_range(-2.5..2.5)).clamp(0.0, 100.0);
                SnapshotPoint {
                    timestamp: now - Duration::days(days - i),
                    quality_score: (score * 10.0).round() / 10.0,
                    average_file_score: Some((score + rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0)),
                }
            })
            .collect();

        let mut by_category = CategoryBreakdown::new();
        for category in BUG_CATEGORIES {
            let count = rng.gen_range(0..12);
            if count > 0 {
                by_category.insert(category.to_string(), count);
            }
        }

        let total_predictions = rng.gen_range(40..400);
        SnapshotResponse {
            snapshots,
            trend: None,
            by_category: Some(by_category),
            feedback: Some(FeedbackCounts {
                with_feedback: rng.gen_range(0..=total_predictions),
                total_predictions,
            }),
        }
    }

    fn aggregate(&self, query: &AggregateQuery) -> BugAggregate {
        let mut rng = self.rng.lock().unwrap();
        let days = query.time_range.days() as i64;
        let now = Utc::now();

        let by_feature: Vec<FeatureBugCount> = ["autofix", "review", "guard", "insights"]
            .iter()
            .map(|feature| {
                let bugs = rng.gen_range(0..30);
                FeatureBugCount {
                    feature: feature.to_string(),
                    bugs,
                    rate: (bugs as f64 / days as f64 * 100.0).round() / 100.0,
                }
            })
            .collect();

        let mut by_category = CategoryBreakdown::new();
        for category in BUG_CATEGORIES {
            by_category.insert(category.to_string(), rng.gen_range(0..20));
        }

        let trends = (0..days)
            .map(|i| {
                let count = rng.gen_range(0..8);
                RatePoint {
                    date: now - Duration::days(days - i),
                    count,
                    rate: (count as f64 / 10.0 * 100.0).round() / 100.0,
                }
            })
            .collect();

        let total = by_feature.iter().map(|f| f.bugs).sum();
        BugAggregate {
            total,
            by_feature,
            by_category,
            trends,
            average_rate: rng.gen_range(0.0..1.0),
        }
    }

    fn activity_page(&self) -> Vec<ActivityEntry> {
        let mut rng = self.rng.lock().unwrap();
        let now = Utc::now();
        (0..rng.gen_range(4..12))
            .map(|i| {
                let (category, status) =
                    ACTIVITY_CATEGORIES[rng.gen_range(0..ACTIVITY_CATEGORIES.len())];
                ActivityEntry {
                    id: Uuid::new_v4().to_string(),
                    timestamp: now - Duration::minutes(i * rng.gen_range(2..30)),
                    category: category.to_string(),
                    subject: format!("repo-{}", rng.gen_range(1..4)),
                    message: format!("{} run finished", category),
                    status,
                    detail: None,
                }
            })
            .collect()
    }

    fn notification_page(&self) -> Vec<NotificationEntry> {
        self.activity_page()
            .into_iter()
            .map(|entry| {
                let action_ref = match entry.category.as_str() {
                    "plugin_update" => Some("plugins/updates".to_string()),
                    "violation" => Some(format!("violations/{}", entry.id)),
                    _ => None,
                };
                NotificationEntry {
                    entry,
                    read: false,
                    action_ref,
                }
            })
            .collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardBackend for MockBackend {
    fn fetch_snapshots(&self, query: SnapshotQuery) -> BoxFuture<'_, Result<SnapshotResponse>> {
        Box::pin(async move { Ok(self.snapshot_response(&query)) })
    }

    fn fetch_aggregate(&self, query: AggregateQuery) -> BoxFuture<'_, Result<BugAggregate>> {
        Box::pin(async move { Ok(self.aggregate(&query)) })
    }

    fn fetch_activities(&self) -> BoxFuture<'_, Result<Vec<ActivityEntry>>> {
        Box::pin(async move { Ok(self.activity_page()) })
    }

    fn fetch_notifications(&self) -> BoxFuture<'_, Result<Vec<NotificationEntry>>> {
        Box::pin(async move { Ok(self.notification_page()) })
    }

    fn mark_notification_read(&self, _id: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}
