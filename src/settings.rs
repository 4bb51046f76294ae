use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::metrics::Period;

/// Poll cadence per data family, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollIntervals {
    pub quality_secs: u64,
    pub bugs_secs: u64,
    pub activity_secs: u64,
    pub notifications_secs: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            quality_secs: 30,
            bugs_secs: 60,
            activity_secs: 15,
            notifications_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Render locally generated data instead of hitting the live service.
    #[serde(default)]
    pub use_mock: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            api_token: None,
            use_mock: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSettings {
    #[serde(default)]
    pub intervals: PollIntervals,
    #[serde(default)]
    pub default_period: Period,
    /// Target feedback-coverage rate that health buckets are judged against.
    #[serde(default = "default_target_rate")]
    pub target_feedback_rate: f64,
    #[serde(default)]
    pub backend: BackendSettings,
}

fn default_target_rate() -> f64 {
    0.3
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            intervals: PollIntervals::default(),
            default_period: Period::default(),
            target_feedback_rate: default_target_rate(),
            backend: BackendSettings::default(),
        }
    }
}

/// JSON-file-backed settings. Unreadable or missing files fall back to
/// defaults rather than failing startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<DashboardSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            DashboardSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> DashboardSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: DashboardSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn update_default_period(&self, period: Period) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.default_period = period;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &DashboardSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
