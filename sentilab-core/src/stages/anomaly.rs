//! Anomaly Detector: joint (sentiment, return) outliers via isolation forest.

use tracing::debug;

use crate::domain::{AnomalyFlag, MergedSeries};
use crate::models::{IsolationForest, IsolationForestConfig};

/// Fits a fresh isolation forest on every call; holds configuration only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    config: IsolationForestConfig,
}

impl AnomalyDetector {
    pub fn new(config: IsolationForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    /// Two-column feature matrix; non-finite values become 0.0.
    pub fn features(series: &MergedSeries) -> Vec<Vec<f64>> {
        series
            .rows
            .iter()
            .map(|r| vec![or_zero(r.avg_sentiment), or_zero(r.ret)])
            .collect()
    }

    /// One flag per row of `series`.
    pub fn detect(&self, series: &MergedSeries) -> Vec<AnomalyFlag> {
        let features = Self::features(series);
        let forest = IsolationForest::fit(self.config, &features);
        let flags: Vec<AnomalyFlag> = forest
            .label(&features)
            .into_iter()
            .map(|outlier| {
                if outlier {
                    AnomalyFlag::Outlier
                } else {
                    AnomalyFlag::Normal
                }
            })
            .collect();

        debug!(
            asset = %series.asset,
            rows = flags.len(),
            outliers = flags.iter().filter(|f| f.is_outlier()).count(),
            trees = forest.n_trees(),
            "anomaly detection"
        );
        flags
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(IsolationForestConfig::default())
    }
}

fn or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DailyObservation;
    use chrono::NaiveDate;

    fn series(n: usize) -> MergedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                let wobble = ((i * 37) % 13) as f64 / 13.0 - 0.5;
                DailyObservation {
                    date: start + chrono::Days::new(i as u64),
                    avg_sentiment: wobble * 0.2,
                    close: 100.0 + i as f64,
                    ret: wobble * 0.01,
                    sentiment_change: 0.0,
                    target: i % 2 == 0,
                }
            })
            .collect();
        MergedSeries {
            asset: "SPY".into(),
            rows,
        }
    }

    #[test]
    fn flags_round_ten_percent() {
        for n in [5, 10, 37, 64, 250] {
            let flags = AnomalyDetector::default().detect(&series(n));
            let outliers = flags.iter().filter(|f| f.is_outlier()).count();
            assert_eq!(outliers, (n as f64 * 0.10).round() as usize, "n = {n}");
        }
    }

    #[test]
    fn same_input_same_flags() {
        let s = series(80);
        let detector = AnomalyDetector::default();
        assert_eq!(detector.detect(&s), detector.detect(&s));
    }

    #[test]
    fn extreme_day_is_flagged() {
        let mut s = series(60);
        s.rows[30].avg_sentiment = -0.95;
        s.rows[30].ret = -0.12;
        let flags = AnomalyDetector::default().detect(&s);
        assert_eq!(flags[30], AnomalyFlag::Outlier);
    }

    #[test]
    fn non_finite_features_become_zero() {
        let mut s = series(3);
        s.rows[1].ret = f64::NAN;
        let features = AnomalyDetector::features(&s);
        assert_eq!(features[1][1], 0.0);
    }
}
