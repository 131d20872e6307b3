//! CART classification tree for a binary target (Gini impurity).

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Candidate features drawn per split.
    pub max_features: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_features: 2,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        positive_fraction: f64,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: TreeNode,
    /// Unnormalized weighted impurity decrease per feature.
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Fit on the rows named by `sample` (repeats allowed, as in a bootstrap).
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[bool],
        sample: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = sample.first().map_or(0, |&i| features[i].len());
        let mut builder = Builder {
            features,
            labels,
            params,
            n_features,
            importances: vec![0.0; n_features],
        };
        let root = builder.grow(sample.to_vec(), 0, rng);
        Self {
            root,
            importances: builder.importances,
        }
    }

    /// Probability of the positive class for one row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { positive_fraction } => return *positive_fraction,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn leaves_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves_of(left) + leaves_of(right),
            }
        }
        leaves_of(&self.root)
    }
}

struct Builder<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [bool],
    params: &'a TreeParams,
    n_features: usize,
    importances: Vec<f64>,
}

impl Builder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| self.labels[i]).count();
        let leaf = TreeNode::Leaf {
            positive_fraction: if n == 0 { 0.5 } else { positives as f64 / n as f64 },
        };

        let pure = positives == 0 || positives == n;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || n < self.params.min_samples_split.max(2) {
            return leaf;
        }

        let Some(best) = self.find_split(&indices, positives, rng) else {
            return leaf;
        };
        self.importances[best.feature] += best.gain * n as f64;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features[i][best.feature] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(left, depth + 1, rng)),
            right: Box::new(self.grow(right, depth + 1, rng)),
        }
    }

    /// Best Gini split over a random permutation of features.
    ///
    /// The first `max_features` features are the candidates; the rest are only
    /// consulted while no candidate has produced a positive gain.
    fn find_split(&self, indices: &[usize], positives: usize, rng: &mut StdRng) -> Option<BestSplit> {
        let order = index::sample(rng, self.n_features, self.n_features).into_vec();
        let n = indices.len() as f64;
        let parent = gini(positives as f64, n);
        let max_features = self.params.max_features.clamp(1, self.n_features.max(1));

        let mut best: Option<BestSplit> = None;
        for (rank, &feature) in order.iter().enumerate() {
            if rank >= max_features && best.is_some() {
                break;
            }

            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features[a][feature]
                    .partial_cmp(&self.features[b][feature])
                    .unwrap_or(Ordering::Equal)
            });

            let total_pos = positives as f64;
            let mut left_n = 0.0;
            let mut left_pos = 0.0;
            for w in 0..sorted.len() - 1 {
                left_n += 1.0;
                if self.labels[sorted[w]] {
                    left_pos += 1.0;
                }
                let here = self.features[sorted[w]][feature];
                let next = self.features[sorted[w + 1]][feature];
                if next <= here {
                    continue;
                }
                let right_n = n - left_n;
                let min_leaf = self.params.min_samples_leaf as f64;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let weighted = (left_n * gini(left_pos, left_n)
                    + right_n * gini(total_pos - left_pos, right_n))
                    / n;
                let gain = parent - weighted;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = (here + next) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Binary Gini impurity for `positives` out of `n`.
fn gini(positives: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = positives / n;
    2.0 * p * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<bool>) {
        let features: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64 / 40.0, ((i * 7) % 11) as f64])
            .collect();
        let labels = features.iter().map(|f| f[0] > 0.5).collect();
        (features, labels)
    }

    #[test]
    fn separable_data_fits_exactly() {
        let (features, labels) = threshold_data();
        let sample: Vec<usize> = (0..features.len()).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let params = TreeParams {
            max_features: 2,
            ..Default::default()
        };
        let tree = DecisionTree::fit(&features, &labels, &sample, &params, &mut rng);

        for (row, &label) in features.iter().zip(&labels) {
            let p = tree.predict_proba(row);
            assert_eq!(p > 0.5, label);
        }
        assert!(tree.importances()[0] > 0.0);
    }

    #[test]
    fn pure_sample_is_a_single_leaf() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![true, true, true];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&features, &labels, &[0, 1, 2], &TreeParams::default(), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_proba(&[10.0]), 1.0);
    }

    #[test]
    fn constant_features_yield_mixed_leaf() {
        let features = vec![vec![1.0, 1.0]; 4];
        let labels = vec![true, false, true, true];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&features, &labels, &[0, 1, 2, 3], &TreeParams::default(), &mut rng);
        assert_eq!(tree.depth(), 1);
        assert!((tree.predict_proba(&[1.0, 1.0]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (features, labels) = threshold_data();
        let sample: Vec<usize> = (0..features.len()).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let params = TreeParams {
            max_depth: Some(1),
            ..Default::default()
        };
        let tree = DecisionTree::fit(&features, &labels, &sample, &params, &mut rng);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(0.0, 10.0), 0.0);
        assert_eq!(gini(10.0, 10.0), 0.0);
        assert!((gini(5.0, 10.0) - 0.5).abs() < 1e-12);
    }
}
