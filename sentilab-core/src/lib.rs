//! SentiLab Core: sentiment/price fusion and backtesting engine.
//!
//! - Domain types (input rows, merged and enriched series, flags, positions)
//! - Series merger and daily sentiment aggregation
//! - Tree models: isolation forest and random forest
//! - Pipeline stages: anomaly, alert, direction classifier, position policy
//! - Deterministic seed hierarchy and run fingerprints

pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod pipeline;
pub mod rng;
pub mod stages;

pub use error::PipelineError;
pub use pipeline::{run, run_merged, Diagnostics, ModelConfig, PipelineConfig, PipelineOutput};
