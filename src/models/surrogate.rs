use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::distribution::PredictiveDistribution;
use crate::error::ModelError;
use crate::models::base_model::PosteriorModel;
use crate::models::kernel::{correlation_matrix, cross_correlation, KernelKind};
use crate::params::{LearningType, Parameters};
use crate::utils::linalg::Cholesky;
use crate::utils::optimize::golden_section;

/// Half-width, in log space, of the length-scale search window around the
/// prior mean.
const LOG_SPAN: f64 = 4.0;
const GOLDEN_ITERATIONS: usize = 40;

/// Correlation matrix of the stored inputs, factorised and applied to the
/// targets and to the constant basis function.
#[derive(Debug, Clone)]
pub struct Factorized {
    pub chol: Cholesky,
    pub y: Array1<f64>,
    /// `K⁻¹ y`
    pub kinv_y: Array1<f64>,
    /// `K⁻¹ 1`
    pub kinv_h: Array1<f64>,
}

impl Factorized {
    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// `yᵀ K⁻¹ y`
    pub fn y_kinv_y(&self) -> f64 {
        self.y.dot(&self.kinv_y)
    }

    /// `1ᵀ K⁻¹ y`
    pub fn h_kinv_y(&self) -> f64 {
        self.kinv_y.sum()
    }

    /// `1ᵀ K⁻¹ 1`
    pub fn h_kinv_h(&self) -> f64 {
        self.kinv_h.sum()
    }
}

/// Cross-correlations of one query point.
#[derive(Debug, Clone)]
pub struct Query {
    pub k: Array1<f64>,
    /// `K⁻¹ k`
    pub kinv_k: Array1<f64>,
}

impl Query {
    /// `kᵀ K⁻¹ k`
    pub fn k_kinv_k(&self) -> f64 {
        self.k.dot(&self.kinv_k)
    }

    /// `1ᵀ K⁻¹ k`
    pub fn h_kinv_k(&self) -> f64 {
        self.kinv_k.sum()
    }

    /// Posterior correlation left at the query, `1 − kᵀ K⁻¹ k`.
    pub fn residual_correlation(&self) -> f64 {
        1.0 - self.k_kinv_k()
    }
}

/// The likelihood/prior part of a kernel regression model.
pub trait Posterior: Send + Sync {
    type Fitted: Send + Sync;

    const NAME: &'static str;

    /// Samples needed before the model can be fitted.
    fn min_samples(&self) -> usize {
        0
    }

    /// Negative log marginal likelihood of the targets, up to a constant.
    fn neg_log_likelihood(&self, f: &Factorized) -> f64;

    fn fit(&self, f: &Factorized) -> Result<Self::Fitted, ModelError>;

    fn predict(&self, f: &Factorized, fitted: &Self::Fitted, q: &Query) -> Result<PredictiveDistribution, ModelError>;
}

/// Kernel regression with an isotropic length-scale learned from data.
pub struct KernelModel<P: Posterior> {
    dim: usize,
    data: Dataset,
    kernel: KernelKind,
    noise: f64,
    length_scale: f64,
    hp_mean: f64,
    hp_std: f64,
    l_type: LearningType,
    search_points: usize,
    /// Reseeds every hyperparameter search so refits on unchanged data agree.
    seed: u64,
    posterior: P,
    state: Option<(Factorized, P::Fitted)>,
}

impl<P: Posterior> KernelModel<P> {
    pub fn new<R: Rng + ?Sized>(dim: usize, params: &Parameters, posterior: P, rng: &mut R) -> Result<Self, ModelError> {
        if dim == 0 {
            return Err(invalid("dim", "must be at least 1"));
        }
        if !(params.noise >= 0.0) || !params.noise.is_finite() {
            return Err(invalid("noise", format!("must be finite and non-negative, got {}", params.noise)));
        }
        if !(params.kernel.hp_mean > 0.0) || !params.kernel.hp_mean.is_finite() {
            return Err(invalid("kernel.hp_mean", format!("must be positive, got {}", params.kernel.hp_mean)));
        }
        if !(params.kernel.hp_std > 0.0) {
            return Err(invalid("kernel.hp_std", format!("must be positive, got {}", params.kernel.hp_std)));
        }
        if params.l_type == LearningType::Empirical && params.hp_search_points < 2 {
            return Err(invalid("hp_search_points", "need at least 2 grid points"));
        }

        Ok(KernelModel {
            dim,
            data: Dataset::new(),
            kernel: params.kernel.name,
            noise: params.noise,
            length_scale: params.kernel.hp_mean,
            hp_mean: params.kernel.hp_mean,
            hp_std: params.kernel.hp_std,
            l_type: params.l_type,
            search_points: params.hp_search_points,
            seed: rng.gen(),
            posterior,
            state: None,
        })
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn check_dim(&self, found: usize) -> Result<(), ModelError> {
        if found != self.dim {
            return Err(ModelError::Dimension {
                expected: self.dim,
                found,
            });
        }
        Ok(())
    }

    fn factorize(&self, length_scale: f64, jitter: bool) -> Result<Factorized, ModelError> {
        let k = correlation_matrix(self.kernel, self.data.x(), length_scale, self.noise);
        let chol = if jitter {
            Cholesky::factor_with_jitter(&k)?
        } else {
            Cholesky::factor(&k)?
        };
        let y = self.data.targets();
        let kinv_y = chol.solve(y.view());
        let kinv_h = chol.solve(Array1::<f64>::ones(y.len()).view());
        Ok(Factorized { chol, y, kinv_y, kinv_h })
    }

    /// Objective in `t = ln ℓ`: negative log likelihood plus the log-normal
    /// prior on the length-scale.
    fn search_cost(&self, t: f64) -> f64 {
        let prior = 0.5 * ((t - self.hp_mean.ln()) / self.hp_std).powi(2);
        match self.factorize(t.exp(), false) {
            Ok(f) => self.posterior.neg_log_likelihood(&f) + prior,
            Err(_) => f64::INFINITY,
        }
    }

    fn search_length_scale(&self) -> Result<f64, ModelError> {
        let center = self.hp_mean.ln();
        let (lo, hi) = (center - LOG_SPAN, center + LOG_SPAN);
        let m = self.search_points;
        let step = (hi - lo) / (m - 1) as f64;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let candidates: Vec<f64> = (0..m)
            .map(|i| lo + step * i as f64)
            .chain((0..m).map(|_| rng.gen_range(lo..hi)))
            .collect();

        let scored: Vec<(f64, f64)> = candidates
            .par_iter()
            .map(|&t| (t, self.search_cost(t)))
            .collect();

        let mut best: Option<(f64, f64)> = None;
        for &(t, cost) in &scored {
            if !cost.is_finite() {
                continue;
            }
            match best {
                Some((_, c)) if c <= cost => {}
                _ => best = Some((t, cost)),
            }
        }
        let (best_t, best_cost) = best.ok_or(ModelError::HyperparameterSearch)?;

        let (refined_t, refined_cost) =
            golden_section(|t| self.search_cost(t), best_t - step, best_t + step, GOLDEN_ITERATIONS);
        let t = if refined_cost < best_cost { refined_t } else { best_t };

        log::debug!(
            "{}: length-scale {:.6} (cost {:.6}) from {} candidates",
            P::NAME,
            t.exp(),
            refined_cost.min(best_cost),
            scored.len()
        );
        Ok(t.exp())
    }
}

impl<P: Posterior> PosteriorModel for KernelModel<P> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn data(&self) -> &Dataset {
        &self.data
    }

    fn set_samples(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        self.check_dim(x.ncols())?;
        self.data.set_samples(x, y)?;
        self.state = None;
        Ok(())
    }

    fn add_sample(&mut self, x: ArrayView1<f64>, y: f64) -> Result<(), ModelError> {
        self.check_dim(x.len())?;
        self.data.add_sample(x.to_owned(), y);
        self.state = None;
        Ok(())
    }

    fn update_hyper_parameters(&mut self) -> Result<(), ModelError> {
        self.length_scale = match self.l_type {
            LearningType::Fixed => self.hp_mean,
            LearningType::Empirical => {
                let have = self.data.n_samples();
                let needed = self.posterior.min_samples();
                if have < needed {
                    return Err(ModelError::InsufficientSamples { needed, have });
                }
                self.search_length_scale()?
            }
        };
        self.state = None;
        Ok(())
    }

    fn fit_surrogate_model(&mut self) -> Result<(), ModelError> {
        let have = self.data.n_samples();
        let needed = self.posterior.min_samples();
        if have < needed {
            return Err(ModelError::InsufficientSamples { needed, have });
        }
        let factorized = self.factorize(self.length_scale, true)?;
        let fitted = self.posterior.fit(&factorized)?;
        self.state = Some((factorized, fitted));
        Ok(())
    }

    fn prediction(&self, x: ArrayView1<f64>) -> Result<PredictiveDistribution, ModelError> {
        self.check_dim(x.len())?;
        let (factorized, fitted) = self.state.as_ref().ok_or(ModelError::NotFitted)?;
        let k = cross_correlation(self.kernel, self.data.x(), x, self.length_scale);
        let kinv_k = factorized.chol.solve(k.view());
        self.posterior.predict(factorized, fitted, &Query { k, kinv_k })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Floors a predictive variance, rejecting non-finite values.
pub(crate) fn checked_variance(var: f64) -> Result<f64, ModelError> {
    if !var.is_finite() {
        return Err(ModelError::Distribution(format!("non-finite predictive variance {}", var)));
    }
    Ok(var.max(MIN_VARIANCE))
}

const MIN_VARIANCE: f64 = 1e-12;
