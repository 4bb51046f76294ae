use std::sync::Arc;
use tokio::sync::Mutex;

use crate::activity::types::ActivityEntry;
use crate::metrics::DataState;

/// Most-recent-first feed of activity entries.
///
/// Each ingest replaces the visible list with the latest page from the
/// source; the source is trusted to deliver newest-first and the log only
/// preserves that order. Filtering never mutates the underlying entries.
pub struct ActivityLog {
    inner: Arc<Mutex<LogState>>,
}

struct LogState {
    entries: Vec<ActivityEntry>,
    populated: bool,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogState {
                entries: Vec::new(),
                populated: false,
            })),
        }
    }

    pub async fn ingest(&self, entries: Vec<ActivityEntry>) {
        let mut state = self.inner.lock().await;
        state.entries = entries;
        state.populated = true;
    }

    pub async fn entries(&self) -> Vec<ActivityEntry> {
        let state = self.inner.lock().await;
        state.entries.clone()
    }

    /// Entries whose category matches, or everything for [`CATEGORY_ALL`].
    /// An unknown category yields an empty view, not an error.
    ///
    /// [`CATEGORY_ALL`]: crate::activity::types::CATEGORY_ALL
    pub async fn filtered(&self, category: &str) -> Vec<ActivityEntry> {
        let state = self.inner.lock().await;
        state
            .entries
            .iter()
            .filter(|entry| entry.matches_category(category))
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

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ActivityLog {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
