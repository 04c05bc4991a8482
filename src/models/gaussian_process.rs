use std::f64::consts::PI;

use crate::distribution::PredictiveDistribution;
use crate::error::ModelError;
use crate::models::surrogate::{checked_variance, Factorized, KernelModel, Posterior, Query};
use crate::params::Parameters;

/// Zero-mean process with a known signal variance.
#[derive(Debug, Clone)]
pub struct GaussianLikelihood {
    sigma_s: f64,
}

pub type GaussianProcess = KernelModel<GaussianLikelihood>;

impl GaussianLikelihood {
    pub fn new(params: &Parameters) -> Result<Self, ModelError> {
        if !(params.sigma_s > 0.0) || !params.sigma_s.is_finite() {
            return Err(ModelError::InvalidParameter {
                name: "sigma_s",
                reason: format!("must be positive, got {}", params.sigma_s),
            });
        }
        Ok(GaussianLikelihood { sigma_s: params.sigma_s })
    }
}

impl Posterior for GaussianLikelihood {
    type Fitted = ();

    const NAME: &'static str = "GaussianProcess";

    fn neg_log_likelihood(&self, f: &Factorized) -> f64 {
        let n = f.n() as f64;
        0.5 * (f.y_kinv_y() / self.sigma_s + n * self.sigma_s.ln() + f.chol.log_det() + n * (2.0 * PI).ln())
    }

    fn fit(&self, _f: &Factorized) -> Result<(), ModelError> {
        Ok(())
    }

    fn predict(&self, f: &Factorized, _fitted: &(), q: &Query) -> Result<PredictiveDistribution, ModelError> {
        let mean = q.k.dot(&f.kinv_y);
        let var = checked_variance(self.sigma_s * q.residual_correlation())?;
        PredictiveDistribution::gaussian(mean, var.sqrt())
    }
}
