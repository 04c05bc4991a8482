//! Outlier filtering for Bayesian optimisation.
//!
//! A [`RobustFilter`] fits a Student-t process to the observed samples and
//! drops every sample whose target falls outside a central predictive
//! interval at its own input.

pub mod dataset;
pub mod distribution;
pub mod error;
pub mod filter;
pub mod models;
pub mod params;
pub mod utils;

pub use dataset::Dataset;
pub use distribution::PredictiveDistribution;
pub use error::{ConfigError, FilterError, ModelError};
pub use filter::{classify, Decision, DecisionRecord, FilterObserver, LogObserver, RobustFilter};
pub use models::base_model::PosteriorModel;
pub use models::create_posterior_model;
pub use params::{LearningType, Parameters, SurrogateKind};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn robust_filtering(_py: Python, m: &PyModule) -> PyResult<()> {
    let _ = env_logger::try_init();
    m.add_class::<filter::RobustFiltering>()?;
    Ok(())
}
