use ndarray::{ArrayView1, ArrayView2};

use crate::dataset::Dataset;
use crate::distribution::PredictiveDistribution;
use crate::error::ModelError;

/// A probabilistic regression model over a stored sample set.
pub trait PosteriorModel: Send {
    /// Input dimensionality fixed at construction.
    fn dim(&self) -> usize;

    fn data(&self) -> &Dataset;

    /// Replace every stored sample.
    fn set_samples(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError>;

    /// Append one sample.
    fn add_sample(&mut self, x: ArrayView1<f64>, y: f64) -> Result<(), ModelError>;

    /// Re-learn kernel hyperparameters from the stored samples.
    fn update_hyper_parameters(&mut self) -> Result<(), ModelError>;

    /// Compute the posterior for the current samples and hyperparameters.
    fn fit_surrogate_model(&mut self) -> Result<(), ModelError>;

    /// Predictive distribution of the latent function at `x`.
    fn prediction(&self, x: ArrayView1<f64>) -> Result<PredictiveDistribution, ModelError>;

    /// Default: learn hyperparameters, then refit.
    fn fit(&mut self) -> Result<(), ModelError> {
        self.update_hyper_parameters()?;
        self.fit_surrogate_model()
    }

    /// Default: predict every row of `xs`.
    fn predictions(&self, xs: ArrayView2<f64>) -> Result<Vec<PredictiveDistribution>, ModelError> {
        xs.rows().into_iter().map(|x| self.prediction(x)).collect()
    }
}
