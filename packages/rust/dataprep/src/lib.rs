//! Data-preparation steps for the lead-scoring staging chain.
//!
//! Each step is a pure `Frame -> Frame` transformation; persistence to the
//! staging store is the orchestration layer's concern. The chain:
//!
//! raw CSV → [`read_raw_csv`] → [`fill_indicator_nulls`] → [`map_city_tier`]
//! → [`collapse_categoricals`] → [`reshape_interactions`]

pub mod categorical;
pub mod city_tier;
pub mod interactions;
pub mod load;

pub use categorical::collapse_categoricals;
pub use city_tier::map_city_tier;
pub use interactions::{ReshapedInteractions, reshape_interactions};
pub use load::{fill_indicator_nulls, read_raw_csv};
