//! Pipeline error taxonomy.
//!
//! Every variant is fatal for the asset run that raised it. Nothing in the
//! engine retries: all stages are deterministic transforms over data that is
//! already in memory.

use thiserror::Error;

/// Errors raised by pipeline stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The join produced no usable rows, or every row was degenerate.
    #[error("empty dataset for '{asset}': {reason}")]
    EmptyDataset { asset: String, reason: String },

    /// The classifier cannot be trained on a single target class.
    #[error(
        "insufficient data for '{asset}': {classes} target class(es) across {rows} training rows (need 2)"
    )]
    InsufficientData {
        asset: String,
        classes: usize,
        rows: usize,
    },

    /// A trailing holdout window that leaves nothing to train on.
    #[error("holdout of {holdout} rows leaves no training data for '{asset}' ({rows} rows)")]
    HoldoutTooLong {
        asset: String,
        holdout: usize,
        rows: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// The asset this error belongs to, if it is asset-scoped.
    pub fn asset(&self) -> Option<&str> {
        match self {
            Self::EmptyDataset { asset, .. }
            | Self::InsufficientData { asset, .. }
            | Self::HoldoutTooLong { asset, .. } => Some(asset),
            Self::InvalidConfig(_) => None,
        }
    }
}
