//! Training pipeline: model input → encoded features → fitted model →
//! registry run + version.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use leadscore_features::encode_features;
use leadscore_model::{EvalMetrics, GbmClassifier, train_test_split};
use leadscore_registry::ModelRegistry;
use leadscore_shared::{Frame, LeadScoreError, Mappings, Mode, Result, TrainingConfig};
use leadscore_staging::{StagingStore, tables};

use crate::StepReporter;
use crate::validation;

/// Configuration for the training pipeline.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub staging_db: PathBuf,
    pub registry_root: PathBuf,
    pub mappings: Mappings,
    pub training: TrainingConfig,
}

/// Result of a training run.
#[derive(Debug)]
pub struct TrainResult {
    /// Run name the artifacts were logged under.
    pub run_name: String,
    /// Registered model version.
    pub version: u32,
    /// Held-out evaluation metrics.
    pub metrics: EvalMetrics,
    pub elapsed: std::time::Duration,
}

/// Encode the staged model input, fit the classifier, and record the run.
///
/// Training errors are fatal and propagate unchanged.
#[instrument(skip_all, fields(experiment = %config.training.experiment))]
pub async fn run_training_pipeline(
    config: &TrainConfig,
    progress: &dyn StepReporter,
) -> Result<TrainResult> {
    let start = Instant::now();
    let mappings = &config.mappings;

    progress.step("Encoding features");
    let store = StagingStore::open(&config.staging_db).await?;
    let model_input = store.read_table(tables::MODEL_INPUT).await?;
    let encoded = encode_features(&model_input, mappings, Mode::Training)?;
    let target = encoded.target.ok_or_else(|| {
        LeadScoreError::Training("no target extracted from model input".into())
    })?;

    store.replace_table(tables::FEATURES, &encoded.features).await?;
    store.replace_table(tables::TARGET, &target).await?;
    validation::check_encoded_features(&store, mappings).await;

    progress.step("Splitting train/test");
    let x = feature_matrix(&encoded.features);
    let y = label_vector(&target, &mappings.label_column)?;
    let split = train_test_split(&x, &y, config.training.test_fraction, config.training.split_seed)?;

    progress.step("Fitting classifier");
    let model = GbmClassifier::fit(&split.x_train, &split.y_train, &config.training.hyperparameters)?;

    progress.step("Evaluating on held-out data");
    let probs = model.predict_proba_batch(&split.x_test)?;
    let metrics = EvalMetrics::compute(&split.y_test, &probs);
    info!(
        accuracy = metrics.accuracy,
        auc = metrics.auc,
        f1 = metrics.f1,
        "held-out evaluation"
    );

    progress.step("Logging run to registry");
    let registry = ModelRegistry::open(&config.registry_root)?;
    let run_name = new_run_name();
    registry.log_run(
        &config.training.experiment,
        &run_name,
        &to_json(&model)?,
        &to_json(&config.training.hyperparameters)?,
        &to_json(&metrics)?,
    )?;
    let version = registry.register_model(
        &config.training.model_name,
        &config.training.experiment,
        &run_name,
    )?;

    let result = TrainResult {
        run_name,
        version,
        metrics,
        elapsed: start.elapsed(),
    };

    progress.done(&format!(
        "registered {} version {}",
        config.training.model_name, result.version
    ));
    info!(
        run = %result.run_name,
        version = result.version,
        elapsed_ms = result.elapsed.as_millis(),
        "training pipeline complete"
    );
    Ok(result)
}

/// Timestamped run name, with a short unique tail for same-second runs.
fn new_run_name() -> String {
    let tail = uuid::Uuid::now_v7().simple().to_string();
    format!("run-{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &tail[..8])
}

/// Row-major f64 matrix from an encoded frame. Encoded cells are always
/// numeric, anything else counts as 0.
pub(crate) fn feature_matrix(frame: &Frame) -> Vec<Vec<f64>> {
    frame
        .rows()
        .iter()
        .map(|row| row.iter().map(|c| c.as_f64().unwrap_or(0.0)).collect())
        .collect()
}

fn label_vector(target: &Frame, label_column: &str) -> Result<Vec<f64>> {
    Ok(target
        .column(label_column)?
        .iter()
        .map(|c| c.as_f64().unwrap_or(0.0))
        .collect())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| LeadScoreError::Training(e.to_string()))
}
