//! Alert Evaluator: low sentiment OR anomaly.

use serde::{Deserialize, Serialize};

use crate::domain::{AnomalyFlag, MergedSeries};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Days with sentiment strictly below this raise an alert.
    pub sentiment_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: -0.3,
        }
    }
}

/// `alert[i] = avg_sentiment[i] < threshold || anomaly[i] == Outlier`.
///
/// Always computed for every row, whether or not the active policy reads it.
pub fn evaluate(series: &MergedSeries, anomaly: &[AnomalyFlag], config: &AlertConfig) -> Vec<bool> {
    series
        .rows
        .iter()
        .zip(anomaly)
        .map(|(row, flag)| row.avg_sentiment < config.sentiment_threshold || flag.is_outlier())
        .collect()
}
