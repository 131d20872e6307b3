//! SentiLab Runner: input loading, asset runs, metrics, and artifacts.
//!
//! This crate builds on `sentilab-core` to provide:
//! - TOML run configuration
//! - CSV loading of the sentiment and price tables, and asset discovery
//! - Performance metrics over the simulated series
//! - Sentiment/price correlation analysis
//! - Single- and multi-asset runs
//! - JSON, CSV, and Markdown export

pub mod config;
pub mod correlation;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, DataConfig, OutputConfig, RunConfig};
pub use correlation::{Correlation, CorrelationPair, CorrelationReport};
pub use data_loader::{load_prices, load_sentiment, AssetInputs, InputLayout, LoadError, Loaded};
pub use export::{export_json, export_series_csv, generate_report, import_json, save_artifacts};
pub use metrics::PerformanceMetrics;
pub use runner::{
    resolve_assets, run_asset, run_asset_from_data, run_assets, AssetOutcome, AssetReport,
    RunError, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<AssetReport>();
        assert_sync::<AssetReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
        assert_send::<CorrelationReport>();
        assert_sync::<CorrelationReport>();
    }

    #[test]
    fn config_and_error_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
