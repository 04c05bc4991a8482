use thiserror::Error;

/// Failures raised by posterior models and the numerical code underneath them.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("expected an input of dimension {expected}, got {found}")]
    Dimension { expected: usize, found: usize },

    #[error("shape mismatch: {rows} input rows but {targets} targets")]
    Shape { rows: usize, targets: usize },

    #[error("{size}x{size} correlation matrix is not positive definite")]
    NotPositiveDefinite { size: usize },

    #[error("model has not been fitted to the current samples")]
    NotFitted,

    #[error("need at least {needed} samples to fit this model, have {have}")]
    InsufficientSamples { needed: usize, have: usize },

    #[error("hyperparameter search found no candidate with a finite likelihood")]
    HyperparameterSearch,

    #[error("invalid predictive distribution: {0}")]
    Distribution(String),
}

/// Failures while loading [`crate::Parameters`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parameter file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse parameters: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures of the robust filter itself.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid margins: up={up}%, low={low}% (both must lie in [0, 100] and leave a non-empty acceptance interval)")]
    InvalidMargins { up: f64, low: f64 },
}

#[cfg(feature = "python")]
impl From<FilterError> for pyo3::PyErr {
    fn from(err: FilterError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
