//! Pipeline orchestration: data staging, training, inference, drift
//! monitoring, and schema validation checks.
//!
//! Each pipeline is a sequential chain of steps over the staging store. Error
//! handling differs per component: data and training steps propagate, the
//! predictor catches and leaves old predictions in place, and the validation
//! checks and drift monitor never fail at all.

pub mod data;
pub mod infer;
pub mod monitor;
pub mod train;
pub mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use data::{DataPipelineConfig, DataPipelineResult, run_data_pipeline};
pub use infer::{InferConfig, InferResult, run_inference_pipeline};
pub use monitor::{DriftReport, run_drift_monitor, run_standalone_monitor};
pub use train::{TrainConfig, TrainResult, run_training_pipeline};
pub use validation::ValidationReport;

/// Progress callback for reporting pipeline steps.
pub trait StepReporter: Send + Sync {
    /// Called when a pipeline step begins.
    fn step(&self, name: &str);
    /// Called with a human-readable summary when the pipeline completes.
    fn done(&self, summary: &str);
}

/// No-op reporter for headless/test usage.
pub struct SilentSteps;

impl StepReporter for SilentSteps {
    fn step(&self, _name: &str) {}
    fn done(&self, _summary: &str) {}
}
