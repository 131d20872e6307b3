//! Position Policy and strategy simulation.

use serde::{Deserialize, Serialize};

use crate::domain::{MergedSeries, Position};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Long when `proba` is strictly above this.
    pub probability_threshold: f64,
    pub use_alerts: bool,
    pub enable_short: bool,
    /// Short when sentiment is strictly below this (long/short mode only).
    pub short_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            probability_threshold: 0.6,
            use_alerts: true,
            enable_short: false,
            short_threshold: -0.7,
        }
    }
}

impl PolicyConfig {
    pub fn mode(&self) -> PolicyMode {
        PolicyMode::from_flags(self.enable_short, self.use_alerts)
    }
}

/// The three mutually exclusive position rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Long iff `proba > p` and the day is alerted.
    AlertGatedLong,
    /// Long iff `proba > p`.
    UngatedLong,
    /// Long iff `proba > p` (and, when gated, not alerted); then short
    /// wherever sentiment is below the short threshold, overriding long.
    LongShort { gate_long_on_alert: bool },
}

impl PolicyMode {
    pub fn from_flags(enable_short: bool, use_alerts: bool) -> Self {
        match (enable_short, use_alerts) {
            (true, gate) => Self::LongShort {
                gate_long_on_alert: gate,
            },
            (false, true) => Self::AlertGatedLong,
            (false, false) => Self::UngatedLong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AlertGatedLong => "alert-gated long-only",
            Self::UngatedLong => "ungated long-only",
            Self::LongShort {
                gate_long_on_alert: true,
            } => "long/short, long leg gated off alerts",
            Self::LongShort {
                gate_long_on_alert: false,
            } => "long/short",
        }
    }

    /// Whether this mode consults the alert series at all.
    pub fn reads_alerts(&self) -> bool {
        !matches!(
            self,
            Self::UngatedLong
                | Self::LongShort {
                    gate_long_on_alert: false
                }
        )
    }
}

/// Position for a single row.
pub fn position_for(
    mode: PolicyMode,
    config: &PolicyConfig,
    proba: f64,
    alert: bool,
    avg_sentiment: f64,
) -> Position {
    let confident = proba > config.probability_threshold;
    match mode {
        PolicyMode::AlertGatedLong => {
            if confident && alert {
                Position::Long
            } else {
                Position::Flat
            }
        }
        PolicyMode::UngatedLong => {
            if confident {
                Position::Long
            } else {
                Position::Flat
            }
        }
        PolicyMode::LongShort { gate_long_on_alert } => {
            if avg_sentiment < config.short_threshold {
                Position::Short
            } else if confident && !(gate_long_on_alert && alert) {
                Position::Long
            } else {
                Position::Flat
            }
        }
    }
}

/// Position column for the whole series under `config.mode()`.
pub fn apply(series: &MergedSeries, proba: &[f64], alert: &[bool], config: &PolicyConfig) -> Vec<Position> {
    let mode = config.mode();
    series
        .rows
        .iter()
        .zip(proba.iter().zip(alert))
        .map(|(row, (&p, &a))| position_for(mode, config, p, a, row.avg_sentiment))
        .collect()
}

/// Strategy and buy-and-hold curves for a position column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub strategy_return: Vec<f64>,
    pub cum_strategy: Vec<f64>,
    pub cum_buy_hold: Vec<f64>,
}

/// `strategy_return = return × position`, compounded from 1.0.
pub fn simulate(returns: &[f64], positions: &[Position]) -> Simulation {
    let strategy_return: Vec<f64> = returns
        .iter()
        .zip(positions)
        .map(|(r, p)| r * p.as_f64())
        .collect();
    Simulation {
        cum_strategy: compound(&strategy_return),
        cum_buy_hold: compound(returns),
        strategy_return,
    }
}

/// Running product of `1 + r`.
pub fn compound(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}
