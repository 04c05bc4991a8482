pub mod base_model;
pub mod gaussian_process;
pub mod kernel;
pub mod student_t;
pub mod surrogate;

use rand::Rng;

use crate::error::ModelError;
use crate::params::{Parameters, SurrogateKind};
use base_model::PosteriorModel;
use gaussian_process::GaussianLikelihood;
use student_t::{JeffreysLikelihood, NigLikelihood};
use surrogate::KernelModel;

/// Builds the surrogate named by `params.surr_name`.
pub fn create_posterior_model<R: Rng + ?Sized>(
    dim: usize,
    params: &Parameters,
    rng: &mut R,
) -> Result<Box<dyn PosteriorModel>, ModelError> {
    let model: Box<dyn PosteriorModel> = match params.surr_name {
        SurrogateKind::GaussianProcess => {
            Box::new(KernelModel::new(dim, params, GaussianLikelihood::new(params)?, rng)?)
        }
        SurrogateKind::StudentTProcessJef => Box::new(KernelModel::new(dim, params, JeffreysLikelihood, rng)?),
        SurrogateKind::StudentTProcessNig => {
            Box::new(KernelModel::new(dim, params, NigLikelihood::new(params)?, rng)?)
        }
    };
    log::debug!("created {:?} surrogate with dim {}", params.surr_name, dim);
    Ok(model)
}
