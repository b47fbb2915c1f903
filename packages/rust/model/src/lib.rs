//! Gradient-boosted tree classifier, data splitting, and evaluation.

pub mod gbm;
pub mod metrics;
pub mod split;

pub use gbm::GbmClassifier;
pub use metrics::EvalMetrics;
pub use split::{TrainTestSplit, train_test_split};
