/// Thresholds for trend classification.
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Relative change (in percent of the first value) below which a series
    /// is reported as stable.
    pub stable_band_pct: f64,

    /// Absolute change band used when the first value is zero and a relative
    /// band is undefined.
    pub zero_baseline_epsilon: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            stable_band_pct: 2.0,
            zero_baseline_epsilon: 1e-9,
        }
    }
}

/// Thresholds for bucketing a rate against its target.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    /// `rate >= healthy_ratio * target` is healthy.
    pub healthy_ratio: f64,

    /// `rate >= attention_ratio * target` still only needs attention;
    /// anything below is critical.
    pub attention_ratio: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            healthy_ratio: 1.0,
            attention_ratio: 0.5,
        }
    }
}
