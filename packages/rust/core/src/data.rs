//! Data pipeline: raw CSV → staging tables → model input.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, instrument};

use leadscore_dataprep::{
    collapse_categoricals, fill_indicator_nulls, map_city_tier, read_raw_csv,
    reshape_interactions,
};
use leadscore_shared::{InteractionMap, Mappings, Mode, Result};
use leadscore_staging::{StagingStore, tables};

use crate::StepReporter;
use crate::validation;

/// Configuration for the data pipeline.
#[derive(Debug, Clone)]
pub struct DataPipelineConfig {
    /// Raw lead CSV to ingest.
    pub csv_path: PathBuf,
    /// Interaction-mapping CSV; the built-in mapping is used when absent.
    pub interaction_mapping_file: Option<PathBuf>,
    /// Staging database path.
    pub staging_db: PathBuf,
    /// Schema and mapping tables.
    pub mappings: Mappings,
    /// Whether the label column is expected and carried through.
    pub mode: Mode,
}

/// Result of a data pipeline run.
#[derive(Debug)]
pub struct DataPipelineResult {
    /// Rows read from the raw CSV.
    pub raw_rows: usize,
    /// Rows after duplicate removal.
    pub deduped_rows: usize,
    /// Rows in the final model-input table.
    pub model_input_rows: usize,
    /// Validation verdicts emitted along the way.
    pub validation: validation::ValidationReport,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Run the staging chain: load → fill nulls → city tier → collapse
/// categoricals → reshape interactions, writing each intermediate table.
///
/// Step errors are logged here and propagate to the caller.
#[instrument(skip_all, fields(csv = %config.csv_path.display()))]
pub async fn run_data_pipeline(
    config: &DataPipelineConfig,
    progress: &dyn StepReporter,
) -> Result<DataPipelineResult> {
    let start = Instant::now();
    let mappings = &config.mappings;
    let mut report = validation::ValidationReport::default();

    info!(mode = ?config.mode, "starting data pipeline");

    progress.step("Loading raw CSV");
    let raw = step("load raw csv", read_raw_csv(&config.csv_path))?;
    let raw_rows = raw.n_rows();

    report.push(validation::check_raw_schema(&raw, mappings, config.mode));

    let staged = step("fill indicator nulls", fill_indicator_nulls(raw, mappings))?;

    progress.step("Opening staging store");
    let store = step("open staging store", StagingStore::open(&config.staging_db).await)?;
    step(
        "write loaded_data",
        store.replace_table(tables::LOADED_DATA, &staged).await,
    )?;

    progress.step("Mapping city tiers");
    let tiered = step("map city tier", map_city_tier(staged, mappings))?;
    step(
        "write city_tier_mapped",
        store.replace_table(tables::CITY_TIER_MAPPED, &tiered).await,
    )?;

    progress.step("Collapsing categorical levels");
    let collapsed = step(
        "collapse categoricals",
        collapse_categoricals(tiered, mappings),
    )?;
    let deduped_rows = collapsed.n_rows();
    step(
        "write categorical_variables_mapped",
        store
            .replace_table(tables::CATEGORICAL_VARIABLES_MAPPED, &collapsed)
            .await,
    )?;

    progress.step("Reshaping interactions");
    let interaction_map = match &config.interaction_mapping_file {
        Some(path) => step("load interaction mapping", InteractionMap::load_csv(path))?,
        None => InteractionMap::builtin(),
    };
    let reshaped = step(
        "reshape interactions",
        reshape_interactions(&collapsed, &interaction_map, mappings, config.mode),
    )?;
    step(
        "write interactions_mapped",
        store
            .replace_table(tables::INTERACTIONS_MAPPED, &reshaped.full)
            .await,
    )?;
    step(
        "write model_input",
        store
            .replace_table(tables::MODEL_INPUT, &reshaped.model_input)
            .await,
    )?;

    progress.step("Checking model-input schema");
    report.push(validation::check_model_input(&store, mappings, config.mode).await);

    let result = DataPipelineResult {
        raw_rows,
        deduped_rows,
        model_input_rows: reshaped.model_input.n_rows(),
        validation: report,
        elapsed: start.elapsed(),
    };

    progress.done(&format!(
        "{} raw rows staged into {} model-input rows",
        result.raw_rows, result.model_input_rows
    ));
    info!(
        raw_rows = result.raw_rows,
        model_input_rows = result.model_input_rows,
        elapsed_ms = result.elapsed.as_millis(),
        "data pipeline complete"
    );
    Ok(result)
}

/// Log a failing step before propagating its error.
fn step<T>(name: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!(step = name, error = %e, "data pipeline step failed");
    }
    result
}
