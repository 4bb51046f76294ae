use crate::metrics::config::{HealthThresholds, TrendConfig};
use crate::metrics::types::{HealthBucket, SnapshotSeries, Trend, TrendDirection};

/// Classify the overall movement of a series.
///
/// `higher_is_better` carries the metric's semantics: a rising quality score
/// improves, a rising bug rate declines. The stability band is applied to the
/// magnitude of the raw change before the semantic inversion, so flipping the
/// flag can never turn a stable series into a moving one.
pub fn classify(series: &SnapshotSeries, higher_is_better: bool, config: &TrendConfig) -> Trend {
    if series.snapshots.len() < 2 {
        return Trend::insufficient_data();
    }

    let first = series.snapshots[0].value;
    let last = series.snapshots[series.snapshots.len() - 1].value;
    let change = last - first;

    // A zero baseline makes a relative figure meaningless, not infinite.
    let change_percent = if first == 0.0 {
        None
    } else {
        Some(change / first * 100.0)
    };

    let beyond_band = match change_percent {
        Some(pct) => pct.abs() > config.stable_band_pct,
        None => change.abs() > config.zero_baseline_epsilon,
    };

    let direction = if !beyond_band {
        TrendDirection::Stable
    } else if (change > 0.0) == higher_is_better {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    };

    Trend {
        direction,
        change,
        change_percent,
    }
}

/// Bucket a rate against its target.
pub fn health_bucket(rate: f64, target_rate: f64, thresholds: &HealthThresholds) -> HealthBucket {
    if rate >= target_rate * thresholds.healthy_ratio {
        HealthBucket::Healthy
    } else if rate >= target_rate * thresholds.attention_ratio {
        HealthBucket::NeedsAttention
    } else {
        HealthBucket::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::MetricSnapshot;
    use chrono::{Duration, Utc};

    fn series_of(values: &[f64]) -> SnapshotSeries {
        let start = Utc::now();
        let snapshots = values
            .iter()
            .enumerate()
            .map(|(i, value)| MetricSnapshot {
                timestamp: start + Duration::minutes(i as i64),
                value: *value,
                secondary_value: None,
            })
            .collect();
        SnapshotSeries::new("test-subject".to_string(), Default::default(), snapshots)
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let config = TrendConfig::default();
        for values in [&[][..], &[42.0][..]] {
            let trend = classify(&series_of(values), true, &config);
            assert_eq!(trend.direction, TrendDirection::InsufficientData);
            assert_eq!(trend.change, 0.0);
            assert_eq!(trend.change_percent, None);
        }
    }

    #[test]
    fn falling_quality_score_declines() {
        let trend = classify(&series_of(&[80.0, 76.0]), true, &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.change, -4.0);
        assert_eq!(trend.change_percent, Some(-5.0));
    }

    #[test]
    fn falling_bug_rate_improves() {
        let trend = classify(&series_of(&[4.0, 1.5]), false, &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.change, -2.5);
    }

    #[test]
    fn small_relative_change_is_stable_regardless_of_semantics() {
        let config = TrendConfig::default();
        // 1% change sits inside the default 2% band.
        for higher_is_better in [true, false] {
            let trend = classify(&series_of(&[100.0, 101.0]), higher_is_better, &config);
            assert_eq!(trend.direction, TrendDirection::Stable);
        }
    }

    #[test]
    fn zero_baseline_has_no_percent_but_keeps_change() {
        let trend = classify(&series_of(&[0.0, 7.0]), true, &TrendConfig::default());
        assert_eq!(trend.change_percent, None);
        assert_eq!(trend.change, 7.0);
        assert_eq!(trend.direction, TrendDirection::Improving);
    }

    #[test]
    fn zero_baseline_uses_absolute_band() {
        let config = TrendConfig {
            zero_baseline_epsilon: 1.0,
            ..TrendConfig::default()
        };
        let trend = classify(&series_of(&[0.0, 0.5]), true, &config);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn intermediate_points_do_not_affect_delta() {
        let trend = classify(&series_of(&[50.0, 90.0, 10.0, 60.0]), true, &TrendConfig::default());
        assert_eq!(trend.change, 10.0);
        assert_eq!(trend.change_percent, Some(20.0));
        assert_eq!(trend.direction, TrendDirection::Improving);
    }

    #[test]
    fn health_bucket_boundaries() {
        let thresholds = HealthThresholds::default();
        assert_eq!(health_bucket(0.3, 0.3, &thresholds), HealthBucket::Healthy);
        assert_eq!(
            health_bucket(0.15, 0.3, &thresholds),
            HealthBucket::NeedsAttention
        );
        assert_eq!(
            health_bucket(0.149, 0.3, &thresholds),
            HealthBucket::Critical
        );
        assert_eq!(health_bucket(0.0, 0.3, &thresholds), HealthBucket::Critical);
    }

    #[test]
    fn zero_target_is_always_healthy() {
        let thresholds = HealthThresholds::default();
        assert_eq!(health_bucket(0.0, 0.0, &thresholds), HealthBucket::Healthy);
    }
}
