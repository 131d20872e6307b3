//! Direction Classifier: P(next-day return > 0) from a random forest.
//!
//! The default fit is in-sample: the forest is trained and scored on the
//! same rows, so downstream metrics describe fit quality rather than genuine
//! predictive skill. A trailing holdout trains on all but the last `k` rows
//! and still scores every row.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AnomalyFlag, MergedSeries};
use crate::error::PipelineError;
use crate::models::{ForestConfig, RandomForest, TreeParams};

/// Column order of the feature matrix.
pub const FEATURE_NAMES: [&str; 4] = ["avg_sentiment", "sentiment_change", "return", "anomaly"];

/// Which rows the forest is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    InSample,
    TrailingHoldout { days: usize },
}

impl ValidationMode {
    pub fn from_holdout_days(days: usize) -> Self {
        if days == 0 {
            Self::InSample
        } else {
            Self::TrailingHoldout { days }
        }
    }

    pub fn holdout_days(&self) -> usize {
        match self {
            Self::InSample => 0,
            Self::TrailingHoldout { days } => *days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub n_trees: usize,
    pub seed: u64,
    pub validation: ValidationMode,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            validation: ValidationMode::InSample,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    /// One probability per row of the input series.
    pub proba: Vec<f64>,
    /// Leading rows used for training; the rest are out-of-sample.
    pub train_len: usize,
    pub importances: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionClassifier {
    config: ClassifierConfig,
}

impl DirectionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Feature rows in [`FEATURE_NAMES`] order.
    pub fn features(series: &MergedSeries, anomaly: &[AnomalyFlag]) -> Vec<Vec<f64>> {
        series
            .rows
            .iter()
            .zip(anomaly)
            .map(|(r, flag)| {
                vec![
                    r.avg_sentiment,
                    r.sentiment_change,
                    r.ret,
                    f64::from(flag.as_i8()),
                ]
            })
            .collect()
    }

    /// Fit a fresh forest and score every row.
    pub fn fit_predict(
        &self,
        series: &MergedSeries,
        anomaly: &[AnomalyFlag],
    ) -> Result<ClassifierOutput, PipelineError> {
        let n = series.len();
        let holdout = self.config.validation.holdout_days();
        if holdout >= n && holdout > 0 {
            return Err(PipelineError::HoldoutTooLong {
                asset: series.asset.clone(),
                holdout,
                rows: n,
            });
        }
        let train_len = n - holdout;

        let features = Self::features(series, anomaly);
        let labels: Vec<bool> = series.rows.iter().map(|r| r.target).collect();

        let positives = labels[..train_len].iter().filter(|&&t| t).count();
        let classes = usize::from(positives > 0) + usize::from(positives < train_len);
        if classes < 2 {
            return Err(PipelineError::InsufficientData {
                asset: series.asset.clone(),
                classes,
                rows: train_len,
            });
        }

        let forest_config = ForestConfig {
            n_trees: self.config.n_trees,
            seed: self.config.seed,
            tree: TreeParams {
                max_features: (FEATURE_NAMES.len() as f64).sqrt().ceil() as usize,
                ..TreeParams::default()
            },
        };
        let forest = RandomForest::fit(&forest_config, &features[..train_len], &labels[..train_len]);
        let proba = forest.predict_proba_all(&features);

        let importances = FEATURE_NAMES
            .iter()
            .zip(forest.feature_importances())
            .map(|(name, importance)| FeatureImportance {
                feature: (*name).to_string(),
                importance,
            })
            .collect();

        debug!(
            asset = %series.asset,
            train_rows = train_len,
            scored_rows = n,
            trees = forest.n_trees(),
            "direction classifier fitted"
        );

        Ok(ClassifierOutput {
            proba,
            train_len,
            importances,
        })
    }
}
