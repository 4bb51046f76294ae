use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;

/// One pollable data family: how to fetch it and how to land the payload in
/// its store.
///
/// The fetch/apply split keeps stale-response discarding and failure handling
/// inside the controller: a payload whose request generation was superseded
/// is dropped before `apply` ever runs, and a failed fetch leaves the store
/// untouched.
pub trait PollSource: Send + Sync + 'static {
    type Params: Clone + Send + Sync + 'static;
    type Payload: Send + 'static;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    fn fetch(&self, params: Self::Params) -> BoxFuture<'_, Result<Self::Payload>>;

    fn apply(&self, params: &Self::Params, payload: Self::Payload) -> BoxFuture<'_, ()>;
}

/// Observable state of one polling loop, for the stale-data indicator.
/// `last_error` holds the most recent transient failure and is cleared by the
/// next successful fetch.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub fetching: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}
