//! Student-t processes: a constant mean and an unknown signal variance are
//! integrated out, which turns the Gaussian predictive into a Student-t.
//!
//! With a normal-inverse-gamma prior the posterior keeps the prior's
//! `2·alpha` degrees of freedom plus one per sample, so a handful of
//! observations already yields heavy but finite tails.

use std::f64::consts::PI;

use statrs::function::gamma::ln_gamma;

use crate::distribution::PredictiveDistribution;
use crate::error::ModelError;
use crate::models::surrogate::{checked_variance, Factorized, KernelModel, Posterior, Query};
use crate::params::Parameters;

/// Normal-inverse-gamma prior: `w | σ² ~ N(coef_mean, σ²·coef_std²)`,
/// `σ² ~ IG(alpha, beta)`.
#[derive(Debug, Clone)]
pub struct NigLikelihood {
    alpha: f64,
    beta: f64,
    w0: f64,
    v0: f64,
}

pub type StudentTProcessNig = KernelModel<NigLikelihood>;

#[derive(Debug, Clone)]
pub struct NigFit {
    pub w: f64,
    pub v: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl NigLikelihood {
    pub fn new(params: &Parameters) -> Result<Self, ModelError> {
        positive("alpha", params.alpha)?;
        positive("beta", params.beta)?;
        positive("mean.coef_std", params.mean.coef_std)?;
        if !params.mean.coef_mean.is_finite() {
            return Err(ModelError::InvalidParameter {
                name: "mean.coef_mean",
                reason: format!("must be finite, got {}", params.mean.coef_mean),
            });
        }
        Ok(NigLikelihood {
            alpha: params.alpha,
            beta: params.beta,
            w0: params.mean.coef_mean,
            v0: params.mean.coef_std * params.mean.coef_std,
        })
    }

    fn posterior(&self, f: &Factorized) -> NigFit {
        let n = f.n() as f64;
        let v_inv = 1.0 / self.v0 + f.h_kinv_h();
        let v = 1.0 / v_inv;
        let w = v * (self.w0 / self.v0 + f.h_kinv_y());
        let quad = f.y_kinv_y() + self.w0 * self.w0 / self.v0 - w * w * v_inv;
        NigFit {
            w,
            v,
            alpha: self.alpha + 0.5 * n,
            beta: self.beta + 0.5 * quad,
        }
    }
}

impl Posterior for NigLikelihood {
    type Fitted = NigFit;

    const NAME: &'static str = "StudentTProcessNIG";

    fn neg_log_likelihood(&self, f: &Factorized) -> f64 {
        let post = self.posterior(f);
        if !(post.beta > 0.0) {
            return f64::INFINITY;
        }
        let n = f.n() as f64;
        let log_evidence = -0.5 * n * (2.0 * PI).ln() - 0.5 * f.chol.log_det() - 0.5 * self.v0.ln()
            + 0.5 * post.v.ln()
            + self.alpha * self.beta.ln()
            - post.alpha * post.beta.ln()
            + ln_gamma(post.alpha)
            - ln_gamma(self.alpha);
        -log_evidence
    }

    fn fit(&self, f: &Factorized) -> Result<NigFit, ModelError> {
        let post = self.posterior(f);
        if !(post.beta > 0.0) || !post.beta.is_finite() {
            return Err(ModelError::Distribution(format!(
                "posterior inverse-gamma scale is {}",
                post.beta
            )));
        }
        Ok(post)
    }

    fn predict(&self, f: &Factorized, fit: &NigFit, q: &Query) -> Result<PredictiveDistribution, ModelError> {
        let r = 1.0 - q.h_kinv_k();
        let mean = fit.w + q.k.dot(&f.kinv_y) - fit.w * q.h_kinv_k();
        let var = checked_variance(fit.beta / fit.alpha * (q.residual_correlation() + r * r * fit.v))?;
        PredictiveDistribution::student_t(mean, var.sqrt(), 2.0 * fit.alpha)
    }
}

/// Jeffreys (non-informative) prior on the mean weight and signal variance.
#[derive(Debug, Clone, Default)]
pub struct JeffreysLikelihood;

pub type StudentTProcessJef = KernelModel<JeffreysLikelihood>;

#[derive(Debug, Clone)]
pub struct JeffreysFit {
    pub w: f64,
    pub h_kinv_h: f64,
    pub sigma2: f64,
    pub dof: f64,
}

impl JeffreysLikelihood {
    /// Generalised least-squares weight and residual quadratic form.
    fn gls(f: &Factorized) -> (f64, f64, f64) {
        let hkh = f.h_kinv_h();
        let hky = f.h_kinv_y();
        let w = hky / hkh;
        (w, hkh, f.y_kinv_y() - hky * w)
    }
}

impl Posterior for JeffreysLikelihood {
    type Fitted = JeffreysFit;

    const NAME: &'static str = "StudentTProcessJef";

    fn min_samples(&self) -> usize {
        2
    }

    fn neg_log_likelihood(&self, f: &Factorized) -> f64 {
        let n = f.n() as f64;
        let (_, hkh, s) = Self::gls(f);
        if !(s > 0.0) || !(hkh > 0.0) {
            return f64::INFINITY;
        }
        0.5 * f.chol.log_det() + 0.5 * hkh.ln() + 0.5 * (n - 1.0) * s.ln()
    }

    fn fit(&self, f: &Factorized) -> Result<JeffreysFit, ModelError> {
        let n = f.n();
        if n < self.min_samples() {
            return Err(ModelError::InsufficientSamples {
                needed: self.min_samples(),
                have: n,
            });
        }
        let (w, hkh, s) = Self::gls(f);
        let dof = (n - 1) as f64;
        Ok(JeffreysFit {
            w,
            h_kinv_h: hkh,
            sigma2: s.max(0.0) / dof,
            dof,
        })
    }

    fn predict(&self, f: &Factorized, fit: &JeffreysFit, q: &Query) -> Result<PredictiveDistribution, ModelError> {
        let r = 1.0 - q.h_kinv_k();
        let mean = fit.w + q.k.dot(&f.kinv_y) - fit.w * q.h_kinv_k();
        let var = checked_variance(fit.sigma2 * (q.residual_correlation() + r * r / fit.h_kinv_h))?;
        PredictiveDistribution::student_t(mean, var.sqrt(), fit.dof)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter {
            name,
            reason: format!("must be positive, got {}", value),
        })
    }
}
