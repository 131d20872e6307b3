//! Isolation Forest for unsupervised outlier scoring.
//!
//! Outliers sit in sparse regions of feature space, so random axis-aligned
//! splits isolate them after fewer cuts than points inside dense clusters.
//! The anomaly score normalizes the mean isolation depth against the expected
//! depth of an unsuccessful BST search over the same subsample size.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::rng::{SeedHierarchy, ISOLATION_STREAM};

/// Euler–Mascheroni constant, for the harmonic-number approximation in `c(n)`.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestConfig {
    pub n_trees: usize,
    /// Upper bound on the per-tree subsample size.
    pub max_samples: usize,
    /// Expected fraction of outliers, used only by [`IsolationForest::label`].
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &[Vec<f64>], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: build_node(data, sample, 0, max_depth, rng),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

fn build_node(
    data: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationNode {
    let n = indices.len();
    if depth >= max_depth || n <= 1 {
        return IsolationNode::Leaf { size: n };
    }

    // Only features that still vary inside this node can isolate anything
    let n_features = data[indices[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(data[i][f]), hi.max(data[i][f]))
            });
            (hi - lo > 1e-12).then_some((f, lo, hi))
        })
        .collect();
    if ranges.is_empty() {
        return IsolationNode::Leaf { size: n };
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| data[i][feature] < threshold);
    if left.is_empty() || right.is_empty() {
        return IsolationNode::Leaf { size: n };
    }

    IsolationNode::Split {
        feature,
        threshold,
        left: Box::new(build_node(data, left, depth + 1, max_depth, rng)),
        right: Box::new(build_node(data, right, depth + 1, max_depth, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted isolation forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: IsolationForestConfig,
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit a fresh forest on `data` (one row per observation).
    pub fn fit(config: IsolationForestConfig, data: &[Vec<f64>]) -> Self {
        let n = data.len();
        let sample_size = config.max_samples.max(1).min(n);
        let max_depth = if sample_size > 1 {
            (sample_size as f64).log2().ceil() as usize
        } else {
            0
        };
        let seeds = SeedHierarchy::new(config.seed);

        let trees = if n == 0 {
            Vec::new()
        } else {
            (0..config.n_trees)
                .map(|t| {
                    let mut rng = seeds.rng_for(ISOLATION_STREAM, t as u64);
                    let sample = index::sample(&mut rng, n, sample_size).into_vec();
                    IsolationTree::build(data, sample, max_depth, &mut rng)
                })
                .collect()
        };

        Self {
            config,
            trees,
            sample_size,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Anomaly score per row in (0, 1]; higher is more anomalous.
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        let c = average_path_length(self.sample_size);
        data.iter()
            .map(|row| {
                if self.trees.is_empty() || c <= 0.0 {
                    return 0.5;
                }
                let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
                    / self.trees.len() as f64;
                2.0_f64.powf(-mean_path / c)
            })
            .collect()
    }

    /// Number of rows flagged for `n` observations at the configured contamination.
    pub fn outlier_count(&self, n: usize) -> usize {
        ((n as f64 * self.config.contamination).round() as usize).min(n)
    }

    /// Flag the `round(contamination × N)` highest-scoring rows as outliers.
    ///
    /// Ties go to the earlier row, so the flagged count is exact.
    pub fn label(&self, data: &[Vec<f64>]) -> Vec<bool> {
        let scores = self.score_samples(data);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut outliers = vec![false; scores.len()];
        for &i in order.iter().take(self.outlier_count(scores.len())) {
            outliers[i] = true;
        }
        outliers
    }
}
