use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel category that selects every entry when filtering.
pub const CATEGORY_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    Success,
    Warning,
    Error,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Success => "success",
            ActivityStatus::Warning => "warning",
            ActivityStatus::Error => "error",
            ActivityStatus::Info => "info",
        }
    }
}

/// One discrete event from the activity feed (a refactor run, a blocked
/// violation, a test result, ...).
///
/// `category` is an open vocabulary: backends introduce new categories
/// without a client release, so it stays a plain string and unknown values
/// pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub subject: String,
    pub message: String,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<BTreeMap<String, serde_json::Value>>,
}

impl ActivityEntry {
    pub fn matches_category(&self, category: &str) -> bool {
        category == CATEGORY_ALL || self.category == category
    }
}
