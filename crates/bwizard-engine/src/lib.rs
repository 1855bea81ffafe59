//! Validation engine, cost estimator and command synthesizer.
//!
//! All three are pure functions of a [`JobConfiguration`] and a
//! [`ClusterCatalog`]; nothing here holds state.
//!
//! [`JobConfiguration`]: bwizard_config::JobConfiguration
//! [`ClusterCatalog`]: bwizard_catalog::ClusterCatalog

pub mod cost;
pub mod derive;
pub mod error;
pub mod synthesize;
pub mod validate;

pub use cost::{estimate, CostEstimate};
pub use error::EngineError;
pub use synthesize::{gpu_resource_string, synthesize, synthesize_script};
pub use validate::validate;
