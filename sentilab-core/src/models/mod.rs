//! Tree models: isolation forest for outliers, random forest for direction.

pub mod decision_tree;
pub mod isolation_forest;
pub mod random_forest;

pub use decision_tree::{DecisionTree, TreeParams};
pub use isolation_forest::{IsolationForest, IsolationForestConfig};
pub use random_forest::{ForestConfig, RandomForest};
