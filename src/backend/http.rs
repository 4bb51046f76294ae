use anyhow::{Context, Result};
use futures::future::BoxFuture;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::activity::ActivityEntry;
use crate::backend::types::{AggregateQuery, SnapshotQuery, SnapshotResponse};
use crate::backend::DashboardBackend;
use crate::metrics::BugAggregate;
use crate::notifications::NotificationEntry;

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBackendConfig {
    /// API root, e.g. `https://app.lintpulse.dev/api`.
    pub base_url: String,
    /// Bearer token attached to every request when present.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Live backend client. Non-2xx statuses and malformed payloads surface as
/// errors for the poller to absorb; nothing here panics or retries.
pub struct HttpBackend {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", url))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("malformed payload from {}", url))
    }
}

impl DashboardBackend for HttpBackend {
    fn fetch_snapshots(&self, query: SnapshotQuery) -> BoxFuture<'_, Result<SnapshotResponse>> {
        Box::pin(async move {
            self.get_json(
                "metrics/snapshots",
                &[
                    ("subjectId", query.subject_id.clone()),
                    ("period", query.period.query_value()),
                ],
            )
            .await
        })
    }

    fn fetch_aggregate(&self, query: AggregateQuery) -> BoxFuture<'_, Result<BugAggregate>> {
        Box::pin(async move {
            self.get_json("metrics/bugs", &[("timeRange", query.time_range.query_value())])
                .await
        })
    }

    fn fetch_activities(&self) -> BoxFuture<'_, Result<Vec<ActivityEntry>>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct ActivityPage {
                #[serde(default)]
                activities: Vec<ActivityEntry>,
            }
            let page: ActivityPage = self.get_json("activity", &[]).await?;
            Ok(page.activities)
        })
    }

    fn fetch_notifications(&self) -> BoxFuture<'_, Result<Vec<NotificationEntry>>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct NotificationPage {
                #[serde(default)]
                notifications: Vec<NotificationEntry>,
            }
            let page: NotificationPage = self.get_json("notifications", &[]).await?;
            Ok(page.notifications)
        })
    }

    fn mark_notification_read(&self, id: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let url = self.url(&format!("notifications/{}/read", id));
            let mut request = self.client.post(&url);
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }
            request
                .send()
                .await
                .with_context(|| format!("request to {} failed", url))?
                .error_for_status()
                .with_context(|| format!("{} returned an error status", url))?;
            Ok(())
        })
    }
}
