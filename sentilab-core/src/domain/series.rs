//! Ordered series: the merger's output and the fully enriched result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::observation::{AnomalyFlag, DailyObservation, Position};

/// Strictly ascending, duplicate-free sequence of merged days for one asset.
///
/// Rebuilt wholesale whenever either input changes; never mutated by later
/// stages, which read it and return their own columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSeries {
    pub asset: String,
    pub rows: Vec<DailyObservation>,
}

impl MergedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn sentiments(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.avg_sentiment).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ret).collect()
    }
}

/// A merged day with every stage's column attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub date: NaiveDate,
    pub avg_sentiment: f64,
    pub close: f64,
    #[serde(rename = "return")]
    pub ret: f64,
    pub sentiment_change: f64,
    pub target: bool,
    pub anomaly: AnomalyFlag,
    pub alert: bool,
    pub proba: f64,
    pub position: Position,
    pub strategy_return: f64,
    pub cum_strategy: f64,
    pub cum_buy_hold: f64,
    /// False for rows inside a trailing holdout window.
    pub in_sample: bool,
}

/// The final product of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSeries {
    pub asset: String,
    pub rows: Vec<EnrichedObservation>,
}

impl EnrichedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn strategy_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.strategy_return).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ret).collect()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.rows.iter().map(|r| r.position).collect()
    }

    pub fn cum_strategy(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cum_strategy).collect()
    }

    pub fn cum_buy_hold(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cum_buy_hold).collect()
    }

    /// Rows outside the training window, if a holdout was configured.
    pub fn out_of_sample(&self) -> impl Iterator<Item = &EnrichedObservation> {
        self.rows.iter().filter(|r| !r.in_sample)
    }

    pub fn alert_dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().filter(|r| r.alert).map(|r| r.date).collect()
    }
}
