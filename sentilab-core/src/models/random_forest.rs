//! Bagged ensemble of CART trees for next-day direction.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::decision_tree::{DecisionTree, TreeParams};
use crate::rng::{SeedHierarchy, CLASSIFIER_STREAM};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub seed: u64,
    pub tree: TreeParams,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            tree: TreeParams::default(),
        }
    }
}

/// A fitted random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit on `features`/`labels`. Each tree draws its bootstrap sample from
    /// the rng for its own index, so tree `i` is the same regardless of how
    /// many trees are fitted around it.
    pub fn fit(config: &ForestConfig, features: &[Vec<f64>], labels: &[bool]) -> Self {
        let n = features.len().min(labels.len());
        let n_features = features.first().map_or(0, Vec::len);
        if n == 0 {
            return Self {
                trees: Vec::new(),
                n_features,
            };
        }

        let seeds = SeedHierarchy::new(config.seed);
        let trees = (0..config.n_trees)
            .map(|t| {
                let mut rng = seeds.rng_for(CLASSIFIER_STREAM, t as u64);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(features, labels, &bootstrap, &config.tree, &mut rng)
            })
            .collect();

        Self { trees, n_features }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean leaf positive fraction across trees.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict_proba_all(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_proba(r)).collect()
    }

    /// Gini importances, normalized per tree and averaged, summing to 1.
    ///
    /// All zeros when no tree ever split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let raw = tree.importances();
            let sum: f64 = raw.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            for (acc, v) in total.iter_mut().zip(raw) {
                *acc += v / sum;
            }
        }
        let grand: f64 = total.iter().sum();
        if grand > 0.0 {
            for v in &mut total {
                *v /= grand;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_threshold(n: usize) -> (Vec<Vec<f64>>, Vec<bool>) {
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let x = i as f64 / n as f64;
                vec![x, ((i * 31) % 17) as f64 / 17.0]
            })
            .collect();
        let labels = features.iter().map(|f| f[0] > 0.4).collect();
        (features, labels)
    }

    #[test]
    fn learns_threshold() {
        let (features, labels) = noisy_threshold(120);
        let forest = RandomForest::fit(&ForestConfig::default(), &features, &labels);
        assert_eq!(forest.n_trees(), 100);

        let proba = forest.predict_proba_all(&features);
        let correct = proba
            .iter()
            .zip(&labels)
            .filter(|(&p, &l)| (p > 0.5) == l)
            .count();
        assert!(correct >= 115, "only {correct} of 120 correct");
    }

    #[test]
    fn probabilities_are_bounded() {
        let (features, labels) = noisy_threshold(50);
        let forest = RandomForest::fit(&ForestConfig::default(), &features, &labels);
        for p in forest.predict_proba_all(&features) {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn importances_favor_informative_feature() {
        let (features, labels) = noisy_threshold(120);
        let forest = RandomForest::fit(&ForestConfig::default(), &features, &labels);
        let imp = forest.feature_importances();
        assert_eq!(imp.len(), 2);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels) = noisy_threshold(60);
        let a = RandomForest::fit(&ForestConfig::default(), &features, &labels);
        let b = RandomForest::fit(&ForestConfig::default(), &features, &labels);
        assert_eq!(a.predict_proba_all(&features), b.predict_proba_all(&features));
    }

    #[test]
    fn empty_training_set() {
        let forest = RandomForest::fit(&ForestConfig::default(), &[], &[]);
        assert_eq!(forest.n_trees(), 0);
        assert_eq!(forest.predict_proba(&[0.0, 0.0]), 0.5);
    }
}
