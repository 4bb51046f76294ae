use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::activity::types::ActivityEntry;
use crate::metrics::DataState;
use serde::{Deserialize, Serialize};

/// An activity entry that carries a read flag and an optional follow-up
/// action reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    #[serde(flatten)]
    pub entry: ActivityEntry,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_ref: Option<String>,
}

impl NotificationEntry {
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// Notification feed with read/unread tracking.
///
/// The center holds only what the source currently reports: each ingest
/// replaces the entry list, carrying locally recorded read flags across by
/// id so a poll that re-fetches the same logical notification cannot reset
/// its read state. Ids the source stopped reporting are dropped.
pub struct NotificationCenter {
    inner: Arc<Mutex<CenterState>>,
}

struct CenterState {
    entries: Vec<NotificationEntry>,
    populated: bool,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CenterState {
                entries: Vec::new(),
                populated: false,
            })),
        }
    }

    pub async fn ingest(&self, incoming: Vec<NotificationEntry>) {
        let mut state = self.inner.lock().await;
        let prior_read: HashMap<String, bool> = state
            .entries
            .iter()
            .map(|n| (n.entry.id.clone(), n.read))
            .collect();

        state.entries = incoming
            .into_iter()
            .map(|mut notification| {
                if let Some(read) = prior_read.get(notification.id()) {
                    notification.read = *read;
                }
                notification
            })
            .collect();
        state.populated = true;
    }

    /// Mark one notification read. Idempotent, and a missing id is a no-op
    /// rather than an error (the entry may have been evicted by a poll that
    /// raced this call). Returns whether the id was present.
    pub async fn mark_read(&self, id: &str) -> bool {
        let mut state = self.inner.lock().await;
        match state.entries.iter_mut().find(|n| n.entry.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// Mark everything read, returning the ids that actually flipped so the
    /// caller can propagate them upstream.
    pub async fn mark_all_read(&self) -> Vec<String> {
        let mut state = self.inner.lock().await;
        let mut flipped = Vec::new();
        for notification in state.entries.iter_mut() {
            if !notification.read {
                notification.read = true;
                flipped.push(notification.entry.id.clone());
            }
        }
        flipped
    }

    /// Recomputed on demand from the entry list; never cached incrementally.
    pub async fn unread_count(&self) -> usize {
        let state = self.inner.lock().await;
        state.entries.iter().filter(|n| !n.read).count()
    }

    pub async fn entries(&self) -> Vec<NotificationEntry> {
        let state = self.inner.lock().await;
        state.entries.clone()
    }

    pub async fn filtered(&self, category: &str) -> Vec<NotificationEntry> {
        let state = self.inner.lock().await;
        state
            .entries
            .iter()
            .filter(|n| n.entry.matches_category(category))
            .cloned()
            .collect()
    }

    pub async fn state(&self) -> DataState {
        let state = self.inner.lock().await;
        if !state.populated {
            DataState::NoDataYet
        } else if state.entries.is_empty() {
            DataState::Empty
        } else {
            DataState::Ready
        }
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for NotificationCenter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::types::{ActivityStatus, CATEGORY_ALL};
    use chrono::Utc;

    fn notification(id: &str, category: &str) -> NotificationEntry {
        NotificationEntry {
            entry: ActivityEntry {
                id: id.to_string(),
                timestamp: Utc::now(),
                category: category.to_string(),
                subject: "repo-a".to_string(),
                message: format!("notification {}", id),
                status: ActivityStatus::Info,
                detail: None,
            },
            read: false,
            action_ref: None,
        }
    }

    #[tokio::test]
    async fn double_ingest_of_identical_set_keeps_unread_count() {
        let center = NotificationCenter::new();
        let page = vec![notification("1", "violation"), notification("2", "test")];

        center.ingest(page.clone()).await;
        assert_eq!(center.unread_count().await, 2);

        center.ingest(page).await;
        assert_eq!(center.unread_count().await, 2);
    }

    #[tokio::test]
    async fn read_state_survives_reingest_of_same_id() {
        let center = NotificationCenter::new();
        center
            .ingest(vec![notification("1", "violation"), notification("2", "test")])
            .await;

        assert!(center.mark_read("1").await);
        assert_eq!(center.unread_count().await, 1);

        // The poller re-fetches the same logical notifications, unread again
        // as far as the wire payload is concerned.
        center
            .ingest(vec![notification("1", "violation"), notification("2", "test")])
            .await;

        let entries = center.entries().await;
        let one = entries.iter().find(|n| n.id() == "1").unwrap();
        assert!(one.read);
        assert_eq!(center.unread_count().await, 1);
    }

    #[tokio::test]
    async fn ids_absent_from_latest_ingest_are_evicted() {
        let center = NotificationCenter::new();
        center
            .ingest(vec![notification("1", "violation"), notification("2", "test")])
            .await;
        center.mark_read("1").await;

        center.ingest(vec![notification("2", "test")]).await;

        assert!(center.entries().await.iter().all(|n| n.id() != "1"));
        assert!(center.filtered("violation").await.is_empty());
        assert_eq!(center.unread_count().await, 1);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_tolerates_missing_ids() {
        let center = NotificationCenter::new();
        center.ingest(vec![notification("1", "test")]).await;

        assert!(center.mark_read("1").await);
        assert!(center.mark_read("1").await);
        assert_eq!(center.unread_count().await, 0);

        // Raced with eviction: not an error.
        assert!(!center.mark_read("gone").await);
    }

    #[tokio::test]
    async fn mark_all_read_reports_only_flipped_ids() {
        let center = NotificationCenter::new();
        center
            .ingest(vec![
                notification("1", "test"),
                notification("2", "test"),
                notification("3", "test"),
            ])
            .await;
        center.mark_read("2").await;

        let mut flipped = center.mark_all_read().await;
        flipped.sort();
        assert_eq!(flipped, vec!["1", "3"]);
        assert_eq!(center.unread_count().await, 0);

        assert!(center.mark_all_read().await.is_empty());
    }

    #[tokio::test]
    async fn category_filter_and_state() {
        let center = NotificationCenter::new();
        assert_eq!(center.state().await, DataState::NoDataYet);

        center
            .ingest(vec![notification("1", "violation"), notification("2", "test")])
            .await;
        assert_eq!(center.state().await, DataState::Ready);
        assert_eq!(center.filtered(CATEGORY_ALL).await.len(), 2);
        assert_eq!(center.filtered("violation").await.len(), 1);
        assert!(center.filtered("unheard-of").await.is_empty());

        center.ingest(Vec::new()).await;
        assert_eq!(center.state().await, DataState::Empty);
    }
}
