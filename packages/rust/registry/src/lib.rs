//! Filesystem-backed experiment tracking and model registry.
//!
//! Layout under the registry root:
//!
//! ```text
//! experiments/<experiment>/<run_name>/{model.json,params.json,metrics.json,meta.json}
//! models/<model_name>/versions/<N>/{model.json,meta.json}
//! ```
//!
//! Runs capture a trained model with its parameters and metrics. Registered
//! versions copy a run's model payload under a monotonically increasing
//! version number and carry a serving stage that `transition` moves between.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use leadscore_shared::{LeadScoreError, Result};

/// Serving stage a registered model version can hold.
pub const STAGE_NONE: &str = "none";
pub const STAGE_ARCHIVED: &str = "archived";

/// Metadata stored alongside a logged run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub experiment: String,
    pub run_name: String,
    pub logged_at: String,
}

/// Metadata stored alongside a registered model version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMeta {
    pub model_name: String,
    pub version: u32,
    pub stage: String,
    pub source_experiment: String,
    pub source_run: String,
    pub registered_at: String,
}

/// A registered model payload loaded back from the store.
#[derive(Debug, Clone)]
pub struct LoadedVersion {
    pub meta: VersionMeta,
    pub model: serde_json::Value,
}

/// Handle on a registry root directory.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Open (creating if needed) a registry rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for sub in ["experiments", "models"] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|e| LeadScoreError::io(&dir, e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record a training run: model payload, hyperparameters, and metrics.
    #[instrument(skip_all, fields(experiment = %experiment, run = %run_name))]
    pub fn log_run(
        &self,
        experiment: &str,
        run_name: &str,
        model: &serde_json::Value,
        params: &serde_json::Value,
        metrics: &serde_json::Value,
    ) -> Result<PathBuf> {
        check_name(experiment)?;
        check_name(run_name)?;
        let run_dir = self
            .root
            .join("experiments")
            .join(experiment)
            .join(run_name);
        if run_dir.exists() {
            return Err(LeadScoreError::Registry(format!(
                "run '{run_name}' already exists in experiment '{experiment}'"
            )));
        }
        std::fs::create_dir_all(&run_dir).map_err(|e| LeadScoreError::io(&run_dir, e))?;

        let meta = RunMeta {
            experiment: experiment.to_string(),
            run_name: run_name.to_string(),
            logged_at: Utc::now().to_rfc3339(),
        };
        write_json(&run_dir.join("model.json"), model)?;
        write_json(&run_dir.join("params.json"), params)?;
        write_json(&run_dir.join("metrics.json"), metrics)?;
        write_json(&run_dir.join("meta.json"), &meta)?;

        info!(path = %run_dir.display(), "logged run");
        Ok(run_dir)
    }

    /// Register a logged run's model under `model_name`, allocating the next
    /// version number. The new version starts in stage `none`.
    #[instrument(skip(self), fields(model = %model_name))]
    pub fn register_model(
        &self,
        model_name: &str,
        experiment: &str,
        run_name: &str,
    ) -> Result<u32> {
        check_name(model_name)?;
        let run_model = self
            .root
            .join("experiments")
            .join(experiment)
            .join(run_name)
            .join("model.json");
        let model: serde_json::Value = read_json(&run_model)?;

        let version = self.list_versions(model_name)?.last().map_or(1, |m| m.version + 1);
        let version_dir = self.version_dir(model_name, version);
        std::fs::create_dir_all(&version_dir)
            .map_err(|e| LeadScoreError::io(&version_dir, e))?;

        let meta = VersionMeta {
            model_name: model_name.to_string(),
            version,
            stage: STAGE_NONE.to_string(),
            source_experiment: experiment.to_string(),
            source_run: run_name.to_string(),
            registered_at: Utc::now().to_rfc3339(),
        };
        write_json(&version_dir.join("model.json"), &model)?;
        write_json(&version_dir.join("meta.json"), &meta)?;

        info!(version, "registered model version");
        Ok(version)
    }

    /// All registered versions of `model_name`, ordered by version number.
    pub fn list_versions(&self, model_name: &str) -> Result<Vec<VersionMeta>> {
        let versions_dir = self.root.join("models").join(model_name).join("versions");
        if !versions_dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        let entries = std::fs::read_dir(&versions_dir)
            .map_err(|e| LeadScoreError::io(&versions_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| LeadScoreError::io(&versions_dir, e))?;
            let meta_path = entry.path().join("meta.json");
            if meta_path.exists() {
                versions.push(read_json::<VersionMeta>(&meta_path)?);
            }
        }
        versions.sort_by_key(|m| m.version);
        Ok(versions)
    }

    /// Move `version` of `model_name` into `stage`, archiving any other
    /// version currently holding that stage.
    #[instrument(skip(self), fields(model = %model_name, version, stage = %stage))]
    pub fn transition(&self, model_name: &str, version: u32, stage: &str) -> Result<()> {
        let target_dir = self.version_dir(model_name, version);
        let target_meta_path = target_dir.join("meta.json");
        if !target_meta_path.exists() {
            return Err(LeadScoreError::Registry(format!(
                "model '{model_name}' has no version {version}"
            )));
        }

        for mut meta in self.list_versions(model_name)? {
            if meta.version != version && meta.stage == stage {
                meta.stage = STAGE_ARCHIVED.to_string();
                let path = self.version_dir(model_name, meta.version).join("meta.json");
                write_json(&path, &meta)?;
                debug!(archived = meta.version, "archived previous stage holder");
            }
        }

        let mut meta: VersionMeta = read_json(&target_meta_path)?;
        meta.stage = stage.to_string();
        write_json(&target_meta_path, &meta)?;
        info!("transitioned model version");
        Ok(())
    }

    /// The highest-numbered version of `model_name` currently in `stage`.
    pub fn latest_by_stage(&self, model_name: &str, stage: &str) -> Result<LoadedVersion> {
        let meta = self
            .list_versions(model_name)?
            .into_iter()
            .filter(|m| m.stage == stage)
            .next_back()
            .ok_or_else(|| {
                LeadScoreError::Registry(format!(
                    "no version of '{model_name}' in stage '{stage}'"
                ))
            })?;
        let model = read_json(&self.version_dir(model_name, meta.version).join("model.json"))?;
        Ok(LoadedVersion { meta, model })
    }

    fn version_dir(&self, model_name: &str, version: u32) -> PathBuf {
        self.root
            .join("models")
            .join(model_name)
            .join("versions")
            .join(version.to_string())
    }
}

/// Names become path components, so restrict them to a safe character set.
fn check_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(LeadScoreError::Registry(format!(
            "invalid registry name: '{name}'"
        )))
    }
}

/// Write JSON atomically: temp file in the same directory, then rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LeadScoreError::Registry(format!("serialize {}: {e}", path.display())))?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, &json).map_err(|e| LeadScoreError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| LeadScoreError::io(path, e))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).map_err(|e| LeadScoreError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| LeadScoreError::Registry(format!("invalid {}: {e}", path.display())))
}
