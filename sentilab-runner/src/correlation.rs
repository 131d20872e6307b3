//! Correlation of sentiment against price level and daily return.
//!
//! Pearson and Spearman coefficients, each with a two-tailed p-value from
//! Student's t with N − 2 degrees of freedom.

use serde::{Deserialize, Serialize};
use sentilab_core::domain::MergedSeries;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::cmp::Ordering;

/// One coefficient with its significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub coefficient: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

impl Correlation {
    pub fn is_significant(&self) -> bool {
        self.p_value < 0.05
    }
}

/// Pearson and Spearman for a single pair of columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub pearson: Correlation,
    pub spearman: Correlation,
}

impl CorrelationPair {
    pub fn compute(x: &[f64], y: &[f64]) -> Self {
        let n = x.len().min(y.len());
        let (x, y) = (&x[..n], &y[..n]);
        let pearson_r = pearson(x, y);
        let spearman_r = pearson(&average_ranks(x), &average_ranks(y));
        Self {
            pearson: Correlation {
                coefficient: pearson_r,
                p_value: p_value(pearson_r, n, x, y),
                sample_size: n,
            },
            spearman: Correlation {
                coefficient: spearman_r,
                p_value: p_value(spearman_r, n, x, y),
                sample_size: n,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub asset: String,
    pub sentiment_vs_close: CorrelationPair,
    pub sentiment_vs_return: CorrelationPair,
}

impl CorrelationReport {
    pub fn compute(series: &MergedSeries) -> Self {
        let sentiment = series.sentiments();
        Self {
            asset: series.asset.clone(),
            sentiment_vs_close: CorrelationPair::compute(&sentiment, &series.closes()),
            sentiment_vs_return: CorrelationPair::compute(&sentiment, &series.returns()),
        }
    }
}

/// Pearson's r; 0.0 when either column has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return 0.0;
    }
    (covariance / denominator).clamp(-1.0, 1.0)
}

/// 1-based ranks, ties sharing the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Two-tailed p-value for `r` over `n` pairs.
fn p_value(r: f64, n: usize, x: &[f64], y: &[f64]) -> f64 {
    if n < 3 || !has_variance(x) || !has_variance(y) {
        return 1.0;
    }
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / denom).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn has_variance(values: &[f64]) -> bool {
    values.windows(2).any(|w| w[0] != w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_linear_relation() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        let pair = CorrelationPair::compute(&x, &y);
        assert!((pair.pearson.coefficient - 1.0).abs() < 1e-12);
        assert!((pair.spearman.coefficient - 1.0).abs() < 1e-12);
        assert!(pair.pearson.p_value < 1e-6);
    }

    #[test]
    fn spearman_ignores_monotone_transform() {
        let x: Vec<f64> = (1..30).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();
        let pair = CorrelationPair::compute(&x, &y);
        assert!((pair.spearman.coefficient - 1.0).abs() < 1e-12);
        assert!(pair.pearson.coefficient < 1.0);
    }

    #[test]
    fn ties_get_average_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn constant_column_is_uninformative() {
        let x = [0.2; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let pair = CorrelationPair::compute(&x, &y);
        assert_eq!(pair.pearson.coefficient, 0.0);
        assert_eq!(pair.pearson.p_value, 1.0);
        assert_eq!(pair.spearman.p_value, 1.0);
    }

    #[test]
    fn too_few_points() {
        let pair = CorrelationPair::compute(&[1.0, 2.0], &[2.0, 1.0]);
        assert_eq!(pair.pearson.p_value, 1.0);
        assert_eq!(pair.pearson.sample_size, 2);
    }

    #[test]
    fn weak_relation_is_not_significant() {
        let x = [0.1, -0.3, 0.4, 0.0, -0.2, 0.3, -0.1, 0.2];
        let y = [1.0, 1.1, 0.9, 1.2, 1.0, 0.95, 1.1, 1.05];
        let pair = CorrelationPair::compute(&x, &y);
        assert!(pair.pearson.p_value > 0.05);
        assert!(!pair.pearson.is_significant());
    }
}
