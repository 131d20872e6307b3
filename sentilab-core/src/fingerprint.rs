//! Run fingerprinting: deterministic identification of (inputs, config) pairs.
//!
//! - `dataset_hash`: BLAKE3 over both input tables, row by row.
//! - `config_hash`: BLAKE3 over the canonical JSON of a `PipelineConfig`.
//! - `run_hash`: both of the above plus the asset.

use serde::{Deserialize, Serialize};

use crate::domain::{PriceRow, SentimentRow};
use crate::pipeline::PipelineConfig;

/// Hex digest identifying the input tables.
pub fn dataset_hash(sentiment: &[SentimentRow], prices: &[PriceRow]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"sentiment");
    hasher.update(&(sentiment.len() as u64).to_le_bytes());
    for row in sentiment {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(&row.avg_sentiment.to_bits().to_le_bytes());
    }
    hasher.update(b"prices");
    hasher.update(&(prices.len() as u64).to_le_bytes());
    for row in prices {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(&row.close.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Hex digest of the configuration.
pub fn config_hash(config: &PipelineConfig) -> Result<String, serde_json::Error> {
    // Struct fields serialize in declaration order, so the JSON is canonical
    let json = serde_json::to_vec(config)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// Complete identity of one asset run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub asset: String,
    pub seed: u64,
    pub dataset_hash: String,
    pub config_hash: String,
    pub run_hash: String,
}

impl RunFingerprint {
    pub fn new(
        asset: &str,
        sentiment: &[SentimentRow],
        prices: &[PriceRow],
        config: &PipelineConfig,
    ) -> Result<Self, serde_json::Error> {
        let dataset_hash = dataset_hash(sentiment, prices);
        let config_hash = config_hash(config)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(asset.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        hasher.update(config_hash.as_bytes());
        let run_hash = hasher.finalize().to_hex().to_string();

        Ok(Self {
            asset: asset.to_string(),
            seed: config.model.seed,
            dataset_hash,
            config_hash,
            run_hash,
        })
    }

    /// First 12 hex characters of the run hash.
    pub fn short(&self) -> &str {
        &self.run_hash[..12.min(self.run_hash.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tables() -> (Vec<SentimentRow>, Vec<PriceRow>) {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        (
            vec![SentimentRow { date: d, avg_sentiment: 0.1 }],
            vec![PriceRow { date: d, close: 100.0 }],
        )
    }

    #[test]
    fn identical_inputs_identical_fingerprint() {
        let (s, p) = tables();
        let config = PipelineConfig::default();
        let a = RunFingerprint::new("SPY", &s, &p, &config).unwrap();
        let b = RunFingerprint::new("SPY", &s, &p, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn config_changes_change_config_hash_only() {
        let (s, p) = tables();
        let base = PipelineConfig::default();
        let mut other = base;
        other.policy.enable_short = true;

        let a = RunFingerprint::new("SPY", &s, &p, &base).unwrap();
        let b = RunFingerprint::new("SPY", &s, &p, &other).unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.config_hash, b.config_hash);
        assert_ne!(a.run_hash, b.run_hash);
    }

    #[test]
    fn data_changes_change_dataset_hash() {
        let (s, mut p) = tables();
        let before = dataset_hash(&s, &p);
        p[0].close = 101.0;
        assert_ne!(before, dataset_hash(&s, &p));
    }

    #[test]
    fn asset_is_part_of_run_hash() {
        let (s, p) = tables();
        let config = PipelineConfig::default();
        let a = RunFingerprint::new("SPY", &s, &p, &config).unwrap();
        let b = RunFingerprint::new("QQQ", &s, &p, &config).unwrap();
        assert_ne!(a.run_hash, b.run_hash);
    }
}
