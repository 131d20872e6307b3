//! Input table loading for the runner.
//!
//! Reads the two per-asset CSV tables from a data directory:
//! - sentiment: `date`, `avg_sentiment`
//! - prices: a date column (`Date`, `date`, `Price` or `index`, else the first
//!   column) and a close column (`Close`, `close` or `Adj Close`)
//!
//! Rows whose date does not parse are skipped and counted. This absorbs the
//! ticker and header preamble rows some price downloaders write below the
//! real header.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use sentilab_core::data::ScoredPost;
use sentilab_core::domain::{PriceRow, SentimentRow};

use crate::config::DataConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// A loaded table and how many data rows were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

/// Both tables for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInputs {
    pub asset: String,
    pub sentiment: Loaded<SentimentRow>,
    pub prices: Loaded<PriceRow>,
}

/// Parse `YYYY-MM-DD`, ignoring any time part that follows.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    let head = cell.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Empty or malformed numbers load as NaN.
fn parse_number(cell: &str) -> f64 {
    cell.trim().parse().unwrap_or(f64::NAN)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            path: path.to_path_buf(),
        });
    }
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn headers(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> Result<Vec<String>, LoadError> {
    let headers = reader.headers().map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(headers.iter().map(str::to_string).collect())
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
}

/// Load a daily sentiment table.
pub fn load_sentiment(path: &Path) -> Result<Loaded<SentimentRow>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let missing = |column: &str| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let date_col = find_column(&headers, &["date"]).ok_or_else(|| missing("date"))?;
    let value_col =
        find_column(&headers, &["avg_sentiment"]).ok_or_else(|| missing("avg_sentiment"))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(date) = record.get(date_col).and_then(parse_date) else {
            skipped += 1;
            continue;
        };
        rows.push(SentimentRow {
            date,
            avg_sentiment: record.get(value_col).map_or(f64::NAN, parse_number),
        });
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped sentiment rows with unparsable dates");
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded sentiment table");
    Ok(Loaded { rows, skipped })
}

/// Load a daily price table.
pub fn load_prices(path: &Path) -> Result<Loaded<PriceRow>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let date_col = find_column(&headers, &["Date", "date", "Price", "index"]).unwrap_or(0);
    let close_col = find_column(&headers, &["Close", "close", "Adj Close"]).ok_or_else(|| {
        LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "Close".to_string(),
        }
    })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(date) = record.get(date_col).and_then(parse_date) else {
            skipped += 1;
            continue;
        };
        rows.push(PriceRow {
            date,
            close: record.get(close_col).map_or(f64::NAN, parse_number),
        });
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped price rows with unparsable dates");
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded price table");
    Ok(Loaded { rows, skipped })
}

/// Earliest Unix timestamp accepted for a post (2000-01-01T00:00:00Z).
pub const MIN_EPOCH_SECS: f64 = 946_684_800.0;

/// Parse a post timestamp: `YYYY-MM-DD HH:MM:SS` (or with a `T`), a bare
/// `YYYY-MM-DD` or compact `YYYYMMDD` date taken as midnight, or Unix seconds.
///
/// Numeric cells are only read as Unix seconds when finite and no earlier
/// than [`MIN_EPOCH_SECS`].
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    let head = cell.get(..19).unwrap_or(cell);
    let formatted = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S"));
    if let Ok(ts) = formatted {
        return Some(ts);
    }
    if let Some(date) = parse_date(cell) {
        return date.and_hms_opt(0, 0, 0);
    }
    if cell.len() == 8 && cell.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(cell, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    let secs = cell
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= MIN_EPOCH_SECS)?;
    DateTime::from_timestamp(secs.trunc() as i64, 0).map(|dt| dt.naive_utc())
}

/// Load already-scored posts (`created_utc`, `sentiment` columns).
pub fn load_scored_posts(path: &Path) -> Result<Loaded<ScoredPost>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let missing = |column: &str| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let time_col = find_column(&headers, &["created_utc", "created"])
        .ok_or_else(|| missing("created_utc"))?;
    let score_col =
        find_column(&headers, &["sentiment", "score"]).ok_or_else(|| missing("sentiment"))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(created) = record.get(time_col).and_then(parse_timestamp) else {
            skipped += 1;
            continue;
        };
        rows.push(ScoredPost {
            created,
            score: record.get(score_col).map_or(f64::NAN, parse_number),
        });
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped posts with unparsable timestamps");
    }
    Ok(Loaded { rows, skipped })
}

/// Write a daily sentiment table in the format [`load_sentiment`] reads.
pub fn write_sentiment(path: &Path, rows: &[SentimentRow]) -> Result<(), LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(["date", "avg_sentiment"]).map_err(csv_err)?;
    for row in rows {
        let value = if row.avg_sentiment.is_finite() {
            row.avg_sentiment.to_string()
        } else {
            String::new()
        };
        wtr.write_record([row.date.to_string(), value]).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves per-asset file paths inside a data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct InputLayout {
    pub dir: PathBuf,
    pub sentiment_pattern: String,
    pub price_pattern: String,
}

impl InputLayout {
    pub fn from_config(config: &DataConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            sentiment_pattern: config.sentiment_pattern.clone(),
            price_pattern: config.price_pattern.clone(),
        }
    }

    pub fn sentiment_path(&self, asset: &str) -> PathBuf {
        self.dir.join(fill_pattern(&self.sentiment_pattern, asset))
    }

    pub fn price_path(&self, asset: &str) -> PathBuf {
        self.dir.join(fill_pattern(&self.price_pattern, asset))
    }

    pub fn load(&self, asset: &str) -> Result<AssetInputs, LoadError> {
        Ok(AssetInputs {
            asset: asset.to_string(),
            sentiment: load_sentiment(&self.sentiment_path(asset))?,
            prices: load_prices(&self.price_path(asset))?,
        })
    }

    /// Assets with a sentiment file in the data directory, sorted.
    pub fn discover_assets(&self) -> Result<Vec<String>, LoadError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| LoadError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut assets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: self.dir.clone(),
                source,
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(asset) = match_pattern(&self.sentiment_pattern, &name.to_string_lossy()) {
                assets.push(asset);
            }
        }
        assets.sort();
        assets.dedup();
        Ok(assets)
    }
}

/// Substitute `{asset}` and `{asset_lower}`.
pub fn fill_pattern(pattern: &str, asset: &str) -> String {
    pattern
        .replace("{asset_lower}", &asset.to_lowercase())
        .replace("{asset}", asset)
}

/// Inverse of [`fill_pattern`] for a single placeholder.
fn match_pattern(pattern: &str, file_name: &str) -> Option<String> {
    let (placeholder, lower) = if pattern.contains("{asset}") {
        ("{asset}", false)
    } else if pattern.contains("{asset_lower}") {
        ("{asset_lower}", true)
    } else {
        return None;
    };
    let (prefix, suffix) = pattern.split_once(placeholder)?;
    let middle = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if middle.is_empty() {
        return None;
    }
    Some(if lower {
        middle.to_uppercase()
    } else {
        middle.to_string()
    })
}
