//! Shared types, error model, and configuration for leadscore.
//!
//! This crate is the foundation depended on by all other leadscore crates.
//! It provides:
//! - [`LeadScoreError`], the unified error type
//! - The [`Frame`] tabular type passed between pipeline steps
//! - The schema registry ([`Mappings`], [`InteractionMap`], [`Mode`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod frame;
pub mod schema;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, HyperParams, PathsConfig, TrainingConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{LeadScoreError, Result};
pub use frame::{Cell, Frame};
pub use schema::{
    AllowList, DEFAULT_CITY_TIER, InteractionMap, Mappings, Mode, OTHERS,
};
