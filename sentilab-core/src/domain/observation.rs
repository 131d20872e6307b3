//! Per-day rows: the two input tables and the merged observation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the daily sentiment table.
///
/// `avg_sentiment` is the daily mean of per-post scores in [-1, 1]. A NaN
/// marks a day whose score is missing; the merger drops such days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentRow {
    pub date: NaiveDate,
    pub avg_sentiment: f64,
}

/// One row of the daily price table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceRow {
    /// A close that can anchor a return: finite and strictly positive.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// A calendar day present in both inputs, with its derived fields.
///
/// Only rows with every derived field defined survive the merger, so none of
/// these fields are optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub avg_sentiment: f64,
    pub close: f64,
    /// Fractional change from the prior merged close.
    #[serde(rename = "return")]
    pub ret: f64,
    /// First difference of `avg_sentiment`.
    pub sentiment_change: f64,
    /// True when the next merged day's return is positive.
    pub target: bool,
}

/// Isolation label for a (sentiment, return) pair.
///
/// Serialized as the conventional `-1` (outlier) / `1` (normal) integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum AnomalyFlag {
    Outlier,
    Normal,
}

impl AnomalyFlag {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Outlier => -1,
            Self::Normal => 1,
        }
    }

    pub fn is_outlier(self) -> bool {
        self == Self::Outlier
    }
}

impl From<AnomalyFlag> for i8 {
    fn from(flag: AnomalyFlag) -> Self {
        flag.as_i8()
    }
}

impl TryFrom<i8> for AnomalyFlag {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Outlier),
            1 => Ok(Self::Normal),
            other => Err(format!("anomaly flag must be -1 or 1, got {other}")),
        }
    }
}

/// Simulated holding for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    Short,
    Flat,
    Long,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Short => -1,
            Self::Flat => 0,
            Self::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_flat(self) -> bool {
        self == Self::Flat
    }
}

impl From<Position> for i8 {
    fn from(position: Position) -> Self {
        position.as_i8()
    }
}

impl TryFrom<i8> for Position {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Short),
            0 => Ok(Self::Flat),
            1 => Ok(Self::Long),
            other => Err(format!("position must be -1, 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_row_sanity() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        assert!(PriceRow { date, close: 101.5 }.is_sane());
        assert!(!PriceRow { date, close: 0.0 }.is_sane());
        assert!(!PriceRow { date, close: f64::NAN }.is_sane());
    }

    #[test]
    fn position_serializes_as_integer() {
        let json = serde_json::to_string(&[Position::Short, Position::Flat, Position::Long]).unwrap();
        assert_eq!(json, "[-1,0,1]");
        let back: Vec<Position> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Position::Short, Position::Flat, Position::Long]);
    }

    #[test]
    fn anomaly_flag_rejects_zero() {
        assert!(serde_json::from_str::<AnomalyFlag>("0").is_err());
        assert_eq!(
            serde_json::from_str::<AnomalyFlag>("-1").unwrap(),
            AnomalyFlag::Outlier
        );
    }

    #[test]
    fn observation_uses_return_column_name() {
        let obs = DailyObservation {
            date: NaiveDate::from_ymd_opt(2024, 8, 2).unwrap(),
            avg_sentiment: 0.1,
            close: 101.0,
            ret: 0.01,
            sentiment_change: 0.05,
            target: true,
        };
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"return\":0.01"));
    }
}
