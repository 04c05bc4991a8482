use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::kernel::KernelKind;

/// Surrogate model family built by [`crate::models::create_posterior_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrogateKind {
    #[default]
    GaussianProcess,
    StudentTProcessJef,
    StudentTProcessNig,
}

/// How kernel hyperparameters are chosen on refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningType {
    /// Keep the prior mean length-scale.
    Fixed,
    /// Maximise the marginal likelihood times the length-scale prior.
    #[default]
    Empirical,
}

/// Prior on the constant mean weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanParameters {
    pub coef_mean: f64,
    pub coef_std: f64,
}

impl Default for MeanParameters {
    fn default() -> Self {
        MeanParameters {
            coef_mean: 0.0,
            coef_std: 1.0,
        }
    }
}

/// Kernel family and log-normal prior on its length-scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelParameters {
    pub name: KernelKind,
    pub hp_mean: f64,
    pub hp_std: f64,
}

impl Default for KernelParameters {
    fn default() -> Self {
        KernelParameters {
            name: KernelKind::MaternIso5,
            hp_mean: 1.0,
            hp_std: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub surr_name: SurrogateKind,
    /// Observation noise, relative to the signal variance.
    pub noise: f64,
    /// Signal variance of the Gaussian process.
    pub sigma_s: f64,
    /// Inverse-gamma shape of the signal variance prior.
    pub alpha: f64,
    /// Inverse-gamma scale of the signal variance prior.
    pub beta: f64,
    pub l_type: LearningType,
    /// Grid size (and number of random draws) for the length-scale search.
    pub hp_search_points: usize,
    /// Percentage of upper-tail mass outside the acceptance interval.
    pub up_margin_pct: f64,
    /// Percentage of lower-tail mass outside the acceptance interval.
    pub low_margin_pct: f64,
    /// Seed for [`Parameters::rng`]; `None` draws from OS entropy.
    pub random_seed: Option<u64>,
    // Tables last so the struct serialises as valid TOML.
    pub mean: MeanParameters,
    pub kernel: KernelParameters,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            surr_name: SurrogateKind::GaussianProcess,
            noise: 1e-6,
            sigma_s: 1.0,
            alpha: 1.0,
            beta: 1.0,
            l_type: LearningType::Empirical,
            hp_search_points: 24,
            up_margin_pct: 5.0,
            low_margin_pct: 5.0,
            random_seed: None,
            mean: MeanParameters::default(),
            kernel: KernelParameters::default(),
        }
    }
}

impl Parameters {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Random source seeded from `random_seed`.
    pub fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        }
    }
}
