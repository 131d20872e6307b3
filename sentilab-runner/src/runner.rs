//! Asset runner: wires together loading, the core pipeline, and metrics.
//!
//! Entry points:
//! - `run_asset_from_data()`: takes pre-loaded tables, no I/O.
//! - `run_asset()`: loads one asset's tables from the data directory, then runs.
//! - `run_assets()`: independent assets in parallel; one failure never
//!   aborts the others.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use sentilab_core::domain::{EnrichedSeries, PriceRow, SentimentRow};
use sentilab_core::fingerprint::RunFingerprint;
use sentilab_core::stages::PolicyMode;
use sentilab_core::{Diagnostics, PipelineConfig, PipelineError};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{InputLayout, LoadError};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("no assets configured and none found in {0}")]
    NoAssets(String),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Row counts of the raw input tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSummary {
    pub sentiment_rows: usize,
    pub price_rows: usize,
    /// Rows dropped at load time for an unparsable date.
    pub skipped_rows: usize,
}

/// Complete result of one asset run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub asset: String,
    pub fingerprint: RunFingerprint,
    pub policy: PolicyMode,
    pub config: PipelineConfig,
    pub metrics: PerformanceMetrics,
    /// Present only when a trailing holdout was configured.
    pub out_of_sample: Option<PerformanceMetrics>,
    pub diagnostics: Diagnostics,
    #[serde(default)]
    pub inputs: InputSummary,
    pub series: EnrichedSeries,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// One entry of a multi-asset run.
#[derive(Debug)]
pub struct AssetOutcome {
    pub asset: String,
    pub result: Result<AssetReport, RunError>,
}

/// Run the pipeline on pre-loaded tables without touching the filesystem.
pub fn run_asset_from_data(
    asset: &str,
    sentiment: &[SentimentRow],
    prices: &[PriceRow],
    config: &PipelineConfig,
) -> Result<AssetReport, RunError> {
    let fingerprint = RunFingerprint::new(asset, sentiment, prices, config)?;
    let output = sentilab_core::run(asset, sentiment, prices, config)?;

    let metrics = PerformanceMetrics::compute(&output.series);
    let out_of_sample = PerformanceMetrics::compute_out_of_sample(&output.series);

    info!(
        asset,
        rows = metrics.days,
        cum_return = metrics.cum_return,
        sharpe = metrics.sharpe,
        exposure = metrics.exposure,
        run = fingerprint.short(),
        "asset run complete"
    );

    Ok(AssetReport {
        schema_version: SCHEMA_VERSION,
        asset: asset.to_string(),
        fingerprint,
        policy: output.mode,
        config: *config,
        metrics,
        out_of_sample,
        diagnostics: output.diagnostics,
        inputs: InputSummary {
            sentiment_rows: sentiment.len(),
            price_rows: prices.len(),
            skipped_rows: 0,
        },
        series: output.series,
    })
}

/// Load one asset's tables from the configured data directory and run.
pub fn run_asset(config: &RunConfig, asset: &str) -> Result<AssetReport, RunError> {
    let layout = InputLayout::from_config(&config.data);
    let inputs = layout.load(asset)?;
    let mut report = run_asset_from_data(
        asset,
        &inputs.sentiment.rows,
        &inputs.prices.rows,
        &config.pipeline,
    )?;
    report.inputs.skipped_rows = inputs.sentiment.skipped + inputs.prices.skipped;
    Ok(report)
}

/// Assets named in the config, or every asset discovered in the data directory.
pub fn resolve_assets(config: &RunConfig) -> Result<Vec<String>, RunError> {
    if !config.data.assets.is_empty() {
        return Ok(config.data.assets.clone());
    }
    let assets = InputLayout::from_config(&config.data).discover_assets()?;
    if assets.is_empty() {
        return Err(RunError::NoAssets(config.data.dir.display().to_string()));
    }
    Ok(assets)
}

/// Run independent assets in parallel, preserving input order.
pub fn run_assets(config: &RunConfig, assets: &[String]) -> Vec<AssetOutcome> {
    assets
        .par_iter()
        .map(|asset| {
            let result = run_asset(config, asset);
            if let Err(e) = &result {
                warn!(asset = %asset, error = %e, "asset run failed");
            }
            AssetOutcome {
                asset: asset.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tables(n: usize) -> (Vec<SentimentRow>, Vec<PriceRow>) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut close = 100.0;
        let mut sentiment = Vec::new();
        let mut prices = Vec::new();
        for i in 0..n {
            let date = start + chrono::Days::new(i as u64);
            close *= 1.0 + (((i * 5) % 9) as f64 - 4.0) / 400.0;
            sentiment.push(SentimentRow {
                date,
                avg_sentiment: ((i * 13) % 19) as f64 / 9.5 - 1.0,
            });
            prices.push(PriceRow { date, close });
        }
        (sentiment, prices)
    }

    #[test]
    fn report_carries_current_schema() {
        let (s, p) = tables(40);
        let report = run_asset_from_data("SPY", &s, &p, &PipelineConfig::default()).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.metrics.days, report.series.len());
        assert!(report.out_of_sample.is_none());
        assert_eq!(report.policy, PolicyMode::AlertGatedLong);
    }

    #[test]
    fn holdout_produces_out_of_sample_metrics() {
        let (s, p) = tables(60);
        let mut config = PipelineConfig::default();
        config.model.holdout_days = 10;
        let report = run_asset_from_data("SPY", &s, &p, &config).unwrap();
        assert_eq!(report.out_of_sample.map(|m| m.days), Some(10));
    }

    #[test]
    fn metrics_json_is_byte_identical_across_runs() {
        let (s, p) = tables(80);
        let config = PipelineConfig::default();
        let a = run_asset_from_data("BTC", &s, &p, &config).unwrap();
        let b = run_asset_from_data("BTC", &s, &p, &config).unwrap();
        assert_eq!(
            serde_json::to_string(&a.metrics).unwrap(),
            serde_json::to_string(&b.metrics).unwrap()
        );
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn pipeline_errors_pass_through() {
        let (s, _) = tables(10);
        let err = run_asset_from_data("SPY", &s, &[], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Pipeline(PipelineError::EmptyDataset { .. })));
    }
}
