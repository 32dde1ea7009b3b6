//! tabprep - Configuration-driven tabular feature preprocessing
//!
//! A per-feature configuration declares, for every column, its output type,
//! whether it is active, and an ordered list of steps (clipping, imputation,
//! re-expression, scaling, discretization, weighting). The crate compiles the
//! configuration into a stage-aligned action plan, assembles a pipeline of
//! column-wise stages from it, and fits / applies that pipeline on polars
//! DataFrames.
//!
//! # Modules
//!
//! - [`config`] - Feature configuration and loading
//! - [`preprocessing`] - Transforms, action plan, pipeline and the [`PreProcessor`](preprocessing::PreProcessor)
//! - [`utils`] - CSV and JSON record loading
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod config;
pub mod preprocessing;
pub mod utils;

// Services
pub mod cli;

pub use error::{PrepError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{load_features_config, parse_features_config, FeatureConfig, FeatureType};
    pub use crate::error::{PrepError, Result};
    pub use crate::preprocessing::{ActionPlan, FeatureTransform, Pipeline, PreProcessor};
}
