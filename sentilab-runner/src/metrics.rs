//! Performance Evaluator: pure functions over the simulated series.
//!
//! Every metric is a pure function: strategy returns, cumulative curve or
//! position column in, scalar out. No dependencies on loading or export.

use serde::{Deserialize, Serialize};
use sentilab_core::domain::{EnrichedObservation, EnrichedSeries, Position};
use sentilab_core::stages::policy::compound;

const TRADING_DAYS: f64 = 252.0;

/// Standard deviations at or below this are treated as zero by [`sharpe_ratio`].
pub const MIN_SHARPE_STD: f64 = 1e-15;

/// Headline statistics for one simulated strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub cum_return: f64,
    pub buy_hold_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    /// Fraction of days with a non-flat position.
    pub exposure: f64,
    /// Signed mean position; negative when short days dominate.
    pub net_exposure: f64,
    pub days: usize,
    pub long_days: usize,
    pub short_days: usize,
}

impl PerformanceMetrics {
    /// Metrics over the whole enriched series.
    pub fn compute(series: &EnrichedSeries) -> Self {
        Self::from_rows(&series.rows, false)
    }

    /// Metrics over the out-of-sample tail, with both curves rebased to 1.0.
    /// `None` when every row was used for training.
    pub fn compute_out_of_sample(series: &EnrichedSeries) -> Option<Self> {
        let rows: Vec<EnrichedObservation> = series.out_of_sample().cloned().collect();
        if rows.is_empty() {
            return None;
        }
        Some(Self::from_rows(&rows, true))
    }

    fn from_rows(rows: &[EnrichedObservation], rebase: bool) -> Self {
        let strategy: Vec<f64> = rows.iter().map(|r| r.strategy_return).collect();
        let returns: Vec<f64> = rows.iter().map(|r| r.ret).collect();
        let positions: Vec<Position> = rows.iter().map(|r| r.position).collect();
        let (cum_strategy, cum_buy_hold) = if rebase {
            (compound(&strategy), compound(&returns))
        } else {
            (
                rows.iter().map(|r| r.cum_strategy).collect(),
                rows.iter().map(|r| r.cum_buy_hold).collect(),
            )
        };

        Self {
            cum_return: cumulative_return(&cum_strategy),
            buy_hold_return: cumulative_return(&cum_buy_hold),
            volatility: volatility(&strategy),
            sharpe: sharpe_ratio(&strategy),
            max_drawdown: max_drawdown(&cum_strategy),
            exposure: exposure(&positions),
            net_exposure: net_exposure(&positions),
            days: rows.len(),
            long_days: positions.iter().filter(|p| **p == Position::Long).count(),
            short_days: positions.iter().filter(|p| **p == Position::Short).count(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Last cumulative value minus one; 0.0 for an empty curve.
pub fn cumulative_return(cum: &[f64]) -> f64 {
    cum.last().map_or(0.0, |last| last - 1.0)
}

/// Annualized sample standard deviation of daily returns.
pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * TRADING_DAYS.sqrt()
}

/// Annualized Sharpe ratio with a zero risk-free rate.
///
/// Returns 0.0 unless the standard deviation exceeds [`MIN_SHARPE_STD`], so a
/// constant series whose std is float residue does not blow up.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if std <= MIN_SHARPE_STD {
        return 0.0;
    }
    mean_f64(returns) / std * TRADING_DAYS.sqrt()
}

/// Largest drop from the running peak of a cumulative curve, as a positive
/// absolute difference (not a percentage of the peak).
pub fn max_drawdown(cum: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in cum {
        peak = peak.max(value);
        max_dd = max_dd.max(peak - value);
    }
    max_dd
}

/// `Σ|position| / N`.
pub fn exposure(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    positions.iter().map(|p| p.as_f64().abs()).sum::<f64>() / positions.len() as f64
}

/// `Σposition / N`.
pub fn net_exposure(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    positions.iter().map(|p| p.as_f64()).sum::<f64>() / positions.len() as f64
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
