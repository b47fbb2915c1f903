//! Application configuration for leadscore.
//!
//! User config lives at `~/.leadscore/leadscore.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoreError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscore.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscore";

// ---------------------------------------------------------------------------
// Config structs (matching leadscore.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Training and registry settings.
    #[serde(default)]
    pub training: TrainingConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw lead-scoring CSV.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Interaction-type → interaction-category mapping CSV. Empty means the
    /// built-in mapping is used.
    #[serde(default)]
    pub interaction_mapping_file: String,

    /// Optional mappings TOML overriding the built-in schema tables.
    #[serde(default)]
    pub mappings_file: String,

    /// SQLite staging database.
    #[serde(default = "default_staging_db")]
    pub staging_db: String,

    /// Drift report artifact, overwritten each inference run.
    #[serde(default = "default_drift_report")]
    pub drift_report: String,

    /// Model registry root directory.
    #[serde(default = "default_registry_root")]
    pub registry_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            interaction_mapping_file: String::new(),
            mappings_file: String::new(),
            staging_db: default_staging_db(),
            drift_report: default_drift_report(),
            registry_root: default_registry_root(),
        }
    }
}

fn default_data_file() -> String {
    "data/leadscoring.csv".into()
}
fn default_staging_db() -> String {
    "var/staging/lead_scoring.db".into()
}
fn default_drift_report() -> String {
    "var/reports/prediction_distribution.txt".into()
}
fn default_registry_root() -> String {
    "var/registry".into()
}

/// `[training]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Experiment name runs are logged under.
    #[serde(default = "default_experiment")]
    pub experiment: String,

    /// Registered model name.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Stage served by the predictor.
    #[serde(default = "default_serving_stage")]
    pub serving_stage: String,

    /// Held-out fraction for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the deterministic train/test split.
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,

    /// Gradient-boosting hyperparameters.
    #[serde(default)]
    pub hyperparameters: HyperParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            experiment: default_experiment(),
            model_name: default_model_name(),
            serving_stage: default_serving_stage(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            hyperparameters: HyperParams::default(),
        }
    }
}

fn default_experiment() -> String {
    "lead_scoring_training_pipeline".into()
}
fn default_model_name() -> String {
    "lead-scoring-gbm".into()
}
fn default_serving_stage() -> String {
    "production".into()
}
fn default_test_fraction() -> f64 {
    0.2
}
fn default_split_seed() -> u64 {
    100
}

/// `[training.hyperparameters]` holds the statically declared GBM configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// Number of boosting rounds.
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Shrinkage applied to each tree's contribution.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Maximum tree depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum rows per leaf.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// L2 regularization on leaf weights.
    #[serde(default = "default_l2_lambda")]
    pub l2_lambda: f64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
            l2_lambda: default_l2_lambda(),
        }
    }
}

fn default_n_trees() -> usize {
    100
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_max_depth() -> usize {
    4
}
fn default_min_samples_leaf() -> usize {
    20
}
fn default_l2_lambda() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscore/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoreError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscore/leadscore.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoreError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LeadScoreError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoreError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoreError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoreError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
