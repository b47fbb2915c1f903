//! Schema registry and versioned mapping tables.
//!
//! The raw CSV schema, the city-to-tier table, the categorical allow-lists,
//! the model-input column lists, and the one-hot vocabulary all live here as
//! configuration data loaded at process start, so test fixtures can
//! substitute alternate mappings.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoreError, Result};

/// Sentinel level for categorical values outside a column's allow-list.
pub const OTHERS: &str = "others";

/// Default tier for cities absent from the city→tier table.
pub const DEFAULT_CITY_TIER: f64 = 3.0;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Whether the pipeline is preparing training data (label present) or
/// inference data (label absent). Passed explicitly through the reshaper and
/// encoder instead of being inferred from incidental column presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Training,
    Inference,
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// One categorical column and the levels considered significant for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowList {
    /// Column the allow-list applies to.
    pub column: String,
    /// Levels kept as-is; everything else collapses to [`OTHERS`].
    pub levels: Vec<String>,
}

/// The full set of declared column sets and lookup tables.
///
/// Deserializable from TOML; [`Mappings::default`] carries the production
/// lead-scoring tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mappings {
    /// Expected columns of the raw lead-scoring CSV (training mode, i.e.
    /// including the label).
    #[serde(default = "default_raw_schema")]
    pub raw_schema: Vec<String>,

    /// Numeric indicator columns whose nulls are filled with 0 at load time.
    #[serde(default = "default_fill_zero")]
    pub fill_zero_columns: Vec<String>,

    /// Free-text city column in the raw data.
    #[serde(default = "default_city_column")]
    pub city_column: String,

    /// Numeric tier column produced by the city-tier mapper.
    #[serde(default = "default_tier_column")]
    pub tier_column: String,

    /// City → tier lookup. Unmapped cities default to [`DEFAULT_CITY_TIER`].
    #[serde(default = "default_city_tier")]
    pub city_tier: BTreeMap<String, f64>,

    /// The three categorical columns with their significant levels.
    #[serde(default = "default_allow_lists")]
    pub allow_lists: Vec<AllowList>,

    /// Identity columns for the interaction reshaper, label excluded.
    /// Order matters: the first entry (the record date) is dropped from the
    /// trimmed model input.
    #[serde(default = "default_identity_columns")]
    pub identity_columns: Vec<String>,

    /// Binary outcome column, present at training time only.
    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Final model-input column list, label excluded.
    #[serde(default = "default_model_input_columns")]
    pub model_input_columns: Vec<String>,

    /// Categorical columns expanded by the one-hot encoder.
    #[serde(default = "default_features_to_encode")]
    pub features_to_encode: Vec<String>,

    /// The fixed, ordered one-hot feature vocabulary expected by the
    /// classifier. Identical at training and inference time.
    #[serde(default = "default_one_hot_vocabulary")]
    pub one_hot_vocabulary: Vec<String>,
}

impl Default for Mappings {
    fn default() -> Self {
        Self {
            raw_schema: default_raw_schema(),
            fill_zero_columns: default_fill_zero(),
            city_column: default_city_column(),
            tier_column: default_tier_column(),
            city_tier: default_city_tier(),
            allow_lists: default_allow_lists(),
            identity_columns: default_identity_columns(),
            label_column: default_label_column(),
            model_input_columns: default_model_input_columns(),
            features_to_encode: default_features_to_encode(),
            one_hot_vocabulary: default_one_hot_vocabulary(),
        }
    }
}

impl Mappings {
    /// Load mappings from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| LeadScoreError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            LeadScoreError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Identity columns for the given mode (label appended in training).
    pub fn identity_columns_for(&self, mode: Mode) -> Vec<String> {
        let mut cols = self.identity_columns.clone();
        if mode == Mode::Training {
            cols.push(self.label_column.clone());
        }
        cols
    }

    /// Model-input columns for the given mode (label appended in training).
    pub fn model_input_columns_for(&self, mode: Mode) -> Vec<String> {
        let mut cols = self.model_input_columns.clone();
        if mode == Mode::Training {
            cols.push(self.label_column.clone());
        }
        cols
    }

    /// Raw schema for the given mode (label removed in inference).
    pub fn raw_schema_for(&self, mode: Mode) -> Vec<String> {
        match mode {
            Mode::Training => self.raw_schema.clone(),
            Mode::Inference => self
                .raw_schema
                .iter()
                .filter(|c| **c != self.label_column)
                .cloned()
                .collect(),
        }
    }

    /// Tier looked up for a city value, with the unmapped default.
    pub fn tier_for(&self, city: Option<&str>) -> f64 {
        city.and_then(|c| self.city_tier.get(c).copied())
            .unwrap_or(DEFAULT_CITY_TIER)
    }
}

// ---------------------------------------------------------------------------
// Default tables
// ---------------------------------------------------------------------------

fn default_city_column() -> String {
    "city_mapped".into()
}

fn default_tier_column() -> String {
    "city_tier".into()
}

fn default_label_column() -> String {
    "app_complete_flag".into()
}

fn default_fill_zero() -> Vec<String> {
    vec!["total_leads_droppped".into(), "referred_lead".into()]
}

fn default_raw_schema() -> Vec<String> {
    let mut cols: Vec<String> = [
        "created_date",
        "city_mapped",
        "first_platform_c",
        "first_utm_medium_c",
        "first_utm_source_c",
        "total_leads_droppped",
        "referred_lead",
        "app_complete_flag",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    cols.extend(default_interaction_type_columns());
    cols
}

/// Per-interaction-type counter columns in the raw data.
fn default_interaction_type_columns() -> Vec<String> {
    [
        "call_us_button_clicked",
        "career_coach_interaction",
        "download_syllabus",
        "emi_plans_clicked",
        "fee_component_click",
        "homepage_support_number_clicked",
        "live_chat_button_clicked",
        "one_on_one_industry_mentorship",
        "payment_btn_click",
        "referral_code_applied",
        "social_referral_click",
        "syllabus_expand",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_city_tier() -> BTreeMap<String, f64> {
    [
        ("bengaluru", 1.0),
        ("chennai", 1.0),
        ("delhi", 1.0),
        ("hyderabad", 1.0),
        ("kolkata", 1.0),
        ("jaipur", 2.0),
        ("kochi", 2.0),
        ("lucknow", 2.0),
        ("pune", 2.0),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}

fn default_allow_lists() -> Vec<AllowList> {
    vec![
        AllowList {
            column: "first_platform_c".into(),
            levels: ["Level0", "Level1", "Level2", "Level3", "Level7", "Level8"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        AllowList {
            column: "first_utm_medium_c".into(),
            levels: ["Level0", "Level2", "Level3", "Level8", "Level11", "Level13"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        AllowList {
            column: "first_utm_source_c".into(),
            levels: ["Level0", "Level2", "Level4", "Level5", "Level6", "Level14", "Level16"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
    ]
}

fn default_identity_columns() -> Vec<String> {
    [
        "created_date",
        "city_tier",
        "first_platform_c",
        "first_utm_medium_c",
        "first_utm_source_c",
        "total_leads_droppped",
        "referred_lead",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_model_input_columns() -> Vec<String> {
    // Identity columns minus the record date.
    default_identity_columns()[1..].to_vec()
}

fn default_features_to_encode() -> Vec<String> {
    [
        "city_tier",
        "first_platform_c",
        "first_utm_medium_c",
        "first_utm_source_c",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_one_hot_vocabulary() -> Vec<String> {
    let mut vocab: Vec<String> = vec![
        "total_leads_droppped".into(),
        "referred_lead".into(),
        "city_tier_1.0".into(),
        "city_tier_2.0".into(),
        "city_tier_3.0".into(),
    ];
    for allow in default_allow_lists() {
        for level in &allow.levels {
            vocab.push(format!("{}_{}", allow.column, level));
        }
        vocab.push(format!("{}_{}", allow.column, OTHERS));
    }
    vocab
}

// ---------------------------------------------------------------------------
// Interaction-type → interaction-category map
// ---------------------------------------------------------------------------

/// Mapping from raw interaction-type column names to aggregated interaction
/// categories, loaded from the interaction-mapping CSV at process start.
#[derive(Debug, Clone)]
pub struct InteractionMap {
    map: BTreeMap<String, String>,
}

impl InteractionMap {
    /// Build from (interaction_type, interaction_category) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Load from a CSV file with `interaction_type` and `interaction_mapping`
    /// header columns.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| LeadScoreError::Csv(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| LeadScoreError::Csv(e.to_string()))?
            .clone();
        let type_idx = headers
            .iter()
            .position(|h| h == "interaction_type")
            .ok_or_else(|| LeadScoreError::Csv("missing 'interaction_type' column".into()))?;
        let cat_idx = headers
            .iter()
            .position(|h| h == "interaction_mapping")
            .ok_or_else(|| LeadScoreError::Csv("missing 'interaction_mapping' column".into()))?;

        let mut map = BTreeMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| LeadScoreError::Csv(e.to_string()))?;
            let ty = record.get(type_idx).unwrap_or_default();
            let cat = record.get(cat_idx).unwrap_or_default();
            if !ty.is_empty() && !cat.is_empty() {
                map.insert(ty.to_string(), cat.to_string());
            }
        }
        tracing::debug!(types = map.len(), "loaded interaction mapping");
        Ok(Self { map })
    }

    /// Category for an interaction type, if mapped.
    pub fn category_of(&self, interaction_type: &str) -> Option<&str> {
        self.map.get(interaction_type).map(String::as_str)
    }

    /// Sorted distinct categories.
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self.map.values().cloned().collect();
        cats.sort();
        cats.dedup();
        cats
    }

    /// The default deployment mapping (used when no CSV is supplied).
    pub fn builtin() -> Self {
        Self::from_pairs(
            [
                ("call_us_button_clicked", "assistance_interaction"),
                ("homepage_support_number_clicked", "assistance_interaction"),
                ("live_chat_button_clicked", "assistance_interaction"),
                ("career_coach_interaction", "career_interaction"),
                ("one_on_one_industry_mentorship", "career_interaction"),
                ("emi_plans_clicked", "payment_interaction"),
                ("fee_component_click", "payment_interaction"),
                ("payment_btn_click", "payment_interaction"),
                ("referral_code_applied", "social_interaction"),
                ("social_referral_click", "social_interaction"),
                ("download_syllabus", "syllabus_interaction"),
                ("syllabus_expand", "syllabus_interaction"),
            ]
            .iter()
            .map(|(t, c)| (t.to_string(), c.to_string())),
        )
    }
}
