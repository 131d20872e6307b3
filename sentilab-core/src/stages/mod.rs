//! Pipeline stages after the merger.
//!
//! Each stage reads the merged series (plus earlier stages' columns) and
//! returns its own column; none of them mutate shared state.

pub mod alert;
pub mod anomaly;
pub mod classifier;
pub mod policy;

pub use alert::AlertConfig;
pub use anomaly::AnomalyDetector;
pub use classifier::{
    ClassifierConfig, ClassifierOutput, DirectionClassifier, FeatureImportance, ValidationMode,
    FEATURE_NAMES,
};
pub use policy::{PolicyConfig, PolicyMode, Simulation};
