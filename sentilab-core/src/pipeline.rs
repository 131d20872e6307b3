//! End-to-end engine: merge → anomaly → alert → classifier → policy.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{merge_series, DateWindow};
use crate::domain::{EnrichedObservation, EnrichedSeries, MergedSeries, PriceRow, SentimentRow};
use crate::error::PipelineError;
use crate::models::IsolationForestConfig;
use crate::stages::{
    alert, policy, AlertConfig, AnomalyDetector, ClassifierConfig, DirectionClassifier,
    FeatureImportance, PolicyConfig, PolicyMode, ValidationMode,
};

/// Model hyperparameters and the master seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub seed: u64,
    pub anomaly_trees: usize,
    pub anomaly_max_samples: usize,
    pub contamination: f64,
    pub classifier_trees: usize,
    /// Trailing rows excluded from classifier training; 0 fits in-sample.
    pub holdout_days: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            anomaly_trees: 100,
            anomaly_max_samples: 256,
            contamination: 0.10,
            classifier_trees: 100,
            holdout_days: 0,
        }
    }
}

impl ModelConfig {
    pub fn isolation(&self) -> IsolationForestConfig {
        IsolationForestConfig {
            n_trees: self.anomaly_trees,
            max_samples: self.anomaly_max_samples,
            contamination: self.contamination,
            seed: self.seed,
        }
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            n_trees: self.classifier_trees,
            seed: self.seed,
            validation: ValidationMode::from_holdout_days(self.holdout_days),
        }
    }
}

/// Everything a single asset run is parameterized by.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub alerts: AlertConfig,
    pub policy: PolicyConfig,
    pub model: ModelConfig,
    pub window: DateWindow,
}

impl PipelineConfig {
    /// Reject values outside their documented domains.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        let s = self.alerts.sentiment_threshold;
        if !(-1.0..=1.0).contains(&s) {
            return invalid(format!("sentiment_threshold {s} outside [-1, 1]"));
        }
        let p = self.policy.probability_threshold;
        if !(p > 0.0 && p < 1.0) {
            return invalid(format!("probability_threshold {p} outside (0, 1)"));
        }
        let st = self.policy.short_threshold;
        if !(-1.0..=0.0).contains(&st) {
            return invalid(format!("short_threshold {st} outside [-1, 0]"));
        }
        let c = self.model.contamination;
        if !(c > 0.0 && c <= 0.5) {
            return invalid(format!("contamination {c} outside (0, 0.5]"));
        }
        if self.model.anomaly_trees == 0 || self.model.classifier_trees == 0 {
            return invalid("tree counts must be at least 1".into());
        }
        if self.model.anomaly_max_samples < 2 {
            return invalid("anomaly_max_samples must be at least 2".into());
        }
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if start > end {
                return invalid(format!("window start {start} is after end {end}"));
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> PolicyMode {
        self.policy.mode()
    }
}

/// Per-run counters and model summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub rows: usize,
    pub outliers: usize,
    pub alerts: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub feature_importances: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub series: EnrichedSeries,
    pub mode: PolicyMode,
    pub diagnostics: Diagnostics,
}

/// Merge the two input tables and run every stage.
pub fn run(
    asset: &str,
    sentiment: &[SentimentRow],
    prices: &[PriceRow],
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    let merged = merge_series(asset, sentiment, prices, &config.window)?;
    run_merged(&merged, config)
}

/// Run every stage after the merger on an already merged series.
pub fn run_merged(merged: &MergedSeries, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    if merged.is_empty() {
        return Err(PipelineError::EmptyDataset {
            asset: merged.asset.clone(),
            reason: "merged series has no rows".into(),
        });
    }

    let anomaly = AnomalyDetector::new(config.model.isolation()).detect(merged);
    let alerts = alert::evaluate(merged, &anomaly, &config.alerts);
    let classified = DirectionClassifier::new(config.model.classifier()).fit_predict(merged, &anomaly)?;
    let positions = policy::apply(merged, &classified.proba, &alerts, &config.policy);
    let sim = policy::simulate(&merged.returns(), &positions);

    let rows: Vec<EnrichedObservation> = merged
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| EnrichedObservation {
            date: r.date,
            avg_sentiment: r.avg_sentiment,
            close: r.close,
            ret: r.ret,
            sentiment_change: r.sentiment_change,
            target: r.target,
            anomaly: anomaly[i],
            alert: alerts[i],
            proba: classified.proba[i],
            position: positions[i],
            strategy_return: sim.strategy_return[i],
            cum_strategy: sim.cum_strategy[i],
            cum_buy_hold: sim.cum_buy_hold[i],
            in_sample: i < classified.train_len,
        })
        .collect();

    let diagnostics = Diagnostics {
        rows: rows.len(),
        outliers: anomaly.iter().filter(|f| f.is_outlier()).count(),
        alerts: alerts.iter().filter(|&&a| a).count(),
        train_rows: classified.train_len,
        holdout_rows: rows.len() - classified.train_len,
        feature_importances: classified.importances,
    };
    let mode = config.mode();
    debug!(
        asset = %merged.asset,
        rows = diagnostics.rows,
        alerts = diagnostics.alerts,
        mode = mode.label(),
        "pipeline complete"
    );

    Ok(PipelineOutput {
        series: EnrichedSeries {
            asset: merged.asset.clone(),
            rows,
        },
        mode,
        diagnostics,
    })
}
