//! TOML run configuration: where the inputs live, how to run, where to write.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use sentilab_core::{PipelineConfig, PipelineError};

/// Default file-name patterns, matching the layout the collectors write.
pub const DEFAULT_SENTIMENT_PATTERN: &str = "daily_sentiment_{asset}_full.csv";
pub const DEFAULT_PRICE_PATTERN: &str = "{asset_lower}_prices.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] PipelineError),

    #[error("file pattern '{0}' has no {{asset}} or {{asset_lower}} placeholder")]
    Pattern(String),
}

/// `[data]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    /// Empty means "every asset discovered in `dir`".
    pub assets: Vec<String>,
    pub sentiment_pattern: String,
    pub price_pattern: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            assets: Vec::new(),
            sentiment_pattern: DEFAULT_SENTIMENT_PATTERN.to_string(),
            price_pattern: DEFAULT_PRICE_PATTERN.to_string(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Artifacts are only written when set.
    pub dir: Option<PathBuf>,
}

/// A complete run configuration.
///
/// The pipeline sections (`[alerts]`, `[policy]`, `[model]`, `[window]`) sit at
/// the top level next to `[data]` and `[output]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    ///
    /// `[window]` bounds may be TOML date literals (`start = 2024-08-01`) or
    /// quoted `YYYY-MM-DD` strings.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = content.parse()?;
        if let Some(toml::Value::Table(window)) = table.get_mut("window") {
            dates_to_strings(window);
        }
        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        for pattern in [&self.data.sentiment_pattern, &self.data.price_pattern] {
            if !pattern.contains("{asset}") && !pattern.contains("{asset_lower}") {
                return Err(ConfigError::Pattern(pattern.clone()));
            }
        }
        Ok(())
    }
}

/// Rewrite TOML date literals as `YYYY-MM-DD` strings.
fn dates_to_strings(table: &mut toml::Table) {
    for (_, value) in table.iter_mut() {
        let date = match value {
            toml::Value::Datetime(dt) if dt.time.is_none() => dt.date,
            _ => None,
        };
        if let Some(d) = date {
            *value = toml::Value::String(format!("{:04}-{:02}-{:02}", d.year, d.month, d.day));
        }
    }
}
