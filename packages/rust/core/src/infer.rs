//! Inference pipeline: model input → encoded features → scored predictions →
//! drift report.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, instrument};

use leadscore_features::encode_features;
use leadscore_model::GbmClassifier;
use leadscore_registry::ModelRegistry;
use leadscore_shared::{Cell, LeadScoreError, Mappings, Mode, Result};
use leadscore_staging::{StagingStore, tables};

use crate::monitor::{DriftReport, run_drift_monitor};
use crate::train::feature_matrix;
use crate::{StepReporter, validation};

/// Configuration for the inference pipeline.
#[derive(Debug, Clone)]
pub struct InferConfig {
    pub staging_db: PathBuf,
    pub registry_root: PathBuf,
    pub drift_report: PathBuf,
    pub mappings: Mappings,
    /// Registered model to serve.
    pub model_name: String,
    /// Stage the served model must hold.
    pub serving_stage: String,
}

/// Result of an inference run.
#[derive(Debug)]
pub struct InferResult {
    /// Rows scored, `None` when scoring failed and old predictions remain.
    pub scored_rows: Option<usize>,
    pub drift: DriftReport,
    pub elapsed: std::time::Duration,
}

/// Encode the staged model input, score it with the serving model, and
/// measure prediction drift.
///
/// Encoding errors propagate. Scoring errors are caught and logged, leaving
/// any previous predictions table untouched; the drift monitor then measures
/// whatever the table currently holds.
#[instrument(skip_all, fields(model = %config.model_name, stage = %config.serving_stage))]
pub async fn run_inference_pipeline(
    config: &InferConfig,
    progress: &dyn StepReporter,
) -> Result<InferResult> {
    let start = Instant::now();
    let mappings = &config.mappings;

    progress.step("Encoding features");
    let store = StagingStore::open(&config.staging_db).await?;
    let model_input = store.read_table(tables::MODEL_INPUT).await?;
    let encoded = encode_features(&model_input, mappings, Mode::Inference)?;
    store.replace_table(tables::FEATURES, &encoded.features).await?;
    validation::check_encoded_features(&store, mappings).await;

    progress.step("Scoring predictions");
    let scored_rows = match score(&store, config).await {
        Ok(rows) => {
            info!(rows, "predictions written");
            Some(rows)
        }
        Err(e) => {
            error!(error = %e, "scoring failed, leaving previous predictions in place");
            None
        }
    };

    progress.step("Monitoring prediction drift");
    let drift = run_drift_monitor(&store, &mappings.label_column, &config.drift_report).await;

    let result = InferResult {
        scored_rows,
        drift,
        elapsed: start.elapsed(),
    };

    progress.done(&match result.scored_rows {
        Some(rows) => format!("scored {rows} leads"),
        None => "scoring failed, previous predictions retained".to_string(),
    });
    info!(
        scored = ?result.scored_rows,
        pct_ones = result.drift.pct_ones,
        elapsed_ms = result.elapsed.as_millis(),
        "inference pipeline complete"
    );
    Ok(result)
}

/// Load the serving model, score the features table, and overwrite the
/// predictions table with features plus the predicted label.
async fn score(store: &StagingStore, config: &InferConfig) -> Result<usize> {
    let registry = ModelRegistry::open(&config.registry_root)?;
    let loaded = registry.latest_by_stage(&config.model_name, &config.serving_stage)?;
    let model: GbmClassifier = serde_json::from_value(loaded.model)
        .map_err(|e| LeadScoreError::Registry(format!("undeserializable model payload: {e}")))?;
    info!(
        version = loaded.meta.version,
        "serving model version loaded"
    );

    let features = store.read_table(tables::FEATURES).await?;
    let labels = model.predict_batch(&feature_matrix(&features))?;

    let mut predictions = features;
    predictions.add_column(
        config.mappings.label_column.clone(),
        labels.into_iter().map(Cell::Int).collect(),
    )?;
    store.replace_table(tables::PREDICTIONS, &predictions).await?;
    Ok(predictions.n_rows())
}
