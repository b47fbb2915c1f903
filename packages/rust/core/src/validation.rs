//! Schema validation checks.
//!
//! Every check resolves to one of two fixed sentences and never returns an
//! error: internal failures (unreadable file, missing table) are logged and
//! count as a mismatch. Row counts are irrelevant, a zero-row table with the
//! right columns passes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use leadscore_dataprep::read_raw_csv;
use leadscore_shared::{Frame, Mappings, Mode};
use leadscore_staging::{StagingStore, tables};

pub const RAW_SCHEMA_OK: &str = "Raw data schema matches the declared raw schema";
pub const RAW_SCHEMA_MISMATCH: &str = "Raw data schema does NOT match the declared raw schema";
pub const MODEL_INPUT_OK: &str = "Model input schema matches the declared model input schema";
pub const MODEL_INPUT_MISMATCH: &str =
    "Model input schema does NOT match the declared model input schema";
pub const FEATURES_OK: &str = "Encoded feature columns match the one-hot vocabulary";
pub const FEATURES_MISMATCH: &str = "Encoded feature columns do NOT match the one-hot vocabulary";

/// Verdict sentences collected over a pipeline run.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub verdicts: Vec<&'static str>,
}

impl ValidationReport {
    pub fn push(&mut self, verdict: &'static str) {
        self.verdicts.push(verdict);
    }

    pub fn all_passed(&self) -> bool {
        self.verdicts
            .iter()
            .all(|v| *v == RAW_SCHEMA_OK || *v == MODEL_INPUT_OK || *v == FEATURES_OK)
    }
}

/// Order-insensitive set equality between the raw frame's columns and the
/// declared raw schema.
pub fn check_raw_schema(frame: &Frame, mappings: &Mappings, mode: Mode) -> &'static str {
    let declared: BTreeSet<String> = mappings.raw_schema_for(mode).into_iter().collect();
    let actual: BTreeSet<String> = frame.columns().iter().cloned().collect();

    if declared == actual {
        info!("{RAW_SCHEMA_OK}");
        RAW_SCHEMA_OK
    } else {
        warn!(
            missing = ?declared.difference(&actual).collect::<Vec<_>>(),
            unexpected = ?actual.difference(&declared).collect::<Vec<_>>(),
            "{RAW_SCHEMA_MISMATCH}"
        );
        RAW_SCHEMA_MISMATCH
    }
}

/// The model-input table must carry at least the declared columns. Each
/// missing column is logged individually before the aggregate verdict.
pub async fn check_model_input(
    store: &StagingStore,
    mappings: &Mappings,
    mode: Mode,
) -> &'static str {
    let actual = match store.table_columns(tables::MODEL_INPUT).await {
        Ok(columns) => columns,
        Err(e) => {
            warn!(error = %e, "could not read model_input columns");
            return MODEL_INPUT_MISMATCH;
        }
    };

    let mut complete = true;
    for declared in mappings.model_input_columns_for(mode) {
        if !actual.contains(&declared) {
            warn!(column = %declared, "declared model-input column missing");
            complete = false;
        }
    }

    if complete {
        info!("{MODEL_INPUT_OK}");
        MODEL_INPUT_OK
    } else {
        warn!("{MODEL_INPUT_MISMATCH}");
        MODEL_INPUT_MISMATCH
    }
}

/// The features table must match the one-hot vocabulary exactly, including
/// column order.
pub async fn check_encoded_features(store: &StagingStore, mappings: &Mappings) -> &'static str {
    let actual = match store.table_columns(tables::FEATURES).await {
        Ok(columns) => columns,
        Err(e) => {
            warn!(error = %e, "could not read features columns");
            return FEATURES_MISMATCH;
        }
    };

    if actual == mappings.one_hot_vocabulary {
        info!("{FEATURES_OK}");
        FEATURES_OK
    } else {
        warn!(
            actual = actual.len(),
            declared = mappings.one_hot_vocabulary.len(),
            "{FEATURES_MISMATCH}"
        );
        FEATURES_MISMATCH
    }
}

/// Configuration for a standalone validation run.
#[derive(Debug, Clone)]
pub struct ValidateConfig {
    /// Raw CSV to check, skipped when `None`.
    pub csv_path: Option<PathBuf>,
    pub staging_db: PathBuf,
    pub mappings: Mappings,
    pub mode: Mode,
}

/// Run every applicable check against the current staging state.
pub async fn run_validation_checks(config: &ValidateConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(csv_path) = &config.csv_path {
        report.push(check_raw_csv(csv_path, &config.mappings, config.mode));
    }

    match StagingStore::open(&config.staging_db).await {
        Ok(store) => {
            report.push(check_model_input(&store, &config.mappings, config.mode).await);
            report.push(check_encoded_features(&store, &config.mappings).await);
        }
        Err(e) => {
            warn!(error = %e, "could not open staging store");
            report.push(MODEL_INPUT_MISMATCH);
            report.push(FEATURES_MISMATCH);
        }
    }
    report
}

fn check_raw_csv(path: &Path, mappings: &Mappings, mode: Mode) -> &'static str {
    match read_raw_csv(path) {
        Ok(frame) => check_raw_schema(&frame, mappings, mode),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read raw CSV");
            RAW_SCHEMA_MISMATCH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscore_shared::Cell;

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("leadscore-validate-{}.db", uuid::Uuid::now_v7()))
    }

    fn frame_with(columns: &[&str]) -> Frame {
        Frame::new(columns.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn raw_check_is_order_insensitive() {
        let mappings = Mappings::default();
        let mut reversed: Vec<&str> = mappings.raw_schema.iter().map(String::as_str).collect();
        reversed.reverse();
        let frame = frame_with(&reversed);
        assert_eq!(
            check_raw_schema(&frame, &mappings, Mode::Training),
            RAW_SCHEMA_OK
        );
    }

    #[test]
    fn raw_check_flags_extra_column() {
        let mappings = Mappings::default();
        let mut columns: Vec<&str> = mappings.raw_schema.iter().map(String::as_str).collect();
        columns.push("surprise");
        let frame = frame_with(&columns);
        assert_eq!(
            check_raw_schema(&frame, &mappings, Mode::Training),
            RAW_SCHEMA_MISMATCH
        );
    }

    #[test]
    fn zero_row_frame_with_right_columns_passes() {
        let mappings = Mappings::default();
        let columns: Vec<&str> = mappings.raw_schema.iter().map(String::as_str).collect();
        let frame = frame_with(&columns);
        assert_eq!(frame.n_rows(), 0);
        assert_eq!(
            check_raw_schema(&frame, &mappings, Mode::Training),
            RAW_SCHEMA_OK
        );
    }

    #[tokio::test]
    async fn model_input_allows_superset() {
        let mappings = Mappings::default();
        let store = StagingStore::open(&temp_db()).await.unwrap();

        let mut columns = mappings.model_input_columns_for(Mode::Training);
        columns.push("extra_interaction".into());
        let mut frame = Frame::new(columns.clone());
        frame
            .push_row(columns.iter().map(|_| Cell::Int(0)).collect())
            .unwrap();
        store.replace_table(tables::MODEL_INPUT, &frame).await.unwrap();

        assert_eq!(
            check_model_input(&store, &mappings, Mode::Training).await,
            MODEL_INPUT_OK
        );
    }

    #[tokio::test]
    async fn model_input_missing_column_fails() {
        let mappings = Mappings::default();
        let store = StagingStore::open(&temp_db()).await.unwrap();

        let mut columns = mappings.model_input_columns_for(Mode::Training);
        columns.pop();
        let frame = Frame::new(columns);
        store.replace_table(tables::MODEL_INPUT, &frame).await.unwrap();

        assert_eq!(
            check_model_input(&store, &mappings, Mode::Training).await,
            MODEL_INPUT_MISMATCH
        );
    }

    #[tokio::test]
    async fn features_check_requires_exact_order() {
        let mappings = Mappings::default();
        let store = StagingStore::open(&temp_db()).await.unwrap();

        let mut columns = mappings.one_hot_vocabulary.clone();
        columns.swap(0, 1);
        let frame = Frame::new(columns);
        store.replace_table(tables::FEATURES, &frame).await.unwrap();

        assert_eq!(
            check_encoded_features(&store, &mappings).await,
            FEATURES_MISMATCH
        );

        let frame = Frame::new(mappings.one_hot_vocabulary.clone());
        store.replace_table(tables::FEATURES, &frame).await.unwrap();
        assert_eq!(check_encoded_features(&store, &mappings).await, FEATURES_OK);
    }

    #[tokio::test]
    async fn missing_tables_never_panic() {
        let config = ValidateConfig {
            csv_path: Some(PathBuf::from("/nonexistent/leads.csv")),
            staging_db: temp_db(),
            mappings: Mappings::default(),
            mode: Mode::Training,
        };
        let report = run_validation_checks(&config).await;
        assert_eq!(report.verdicts.len(), 3);
        assert!(!report.all_passed());
    }
}
