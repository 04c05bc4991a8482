use ndarray::{ArrayView1, ArrayView2};
use rand::Rng;

use crate::dataset::Dataset;
use crate::error::FilterError;
use crate::models::base_model::PosteriorModel;
use crate::models::create_posterior_model;
use crate::params::{Parameters, SurrogateKind};

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Observation noise of the heavy-tailed model used for filtering.
pub const ROBUST_NOISE: f64 = 1e-3;

/// Points are reverted to the unfiltered set when no more than this fraction
/// of them survives.
const MIN_KEPT_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Kept,
    Removed,
}

/// Keeps `target` only if it lies strictly inside `(f_low, f_up)`.
pub fn classify(target: f64, f_low: f64, f_up: f64) -> Decision {
    if f_low < target && target < f_up {
        Decision::Kept
    } else {
        Decision::Removed
    }
}

/// One per-point decision made during a filtering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub index: usize,
    pub value: f64,
    pub f_low: f64,
    pub f_up: f64,
    pub decision: Decision,
    /// Predictive mean at the sample's input.
    pub mean: f64,
}

/// Receives the decisions of a filtering pass. Never affects the outcome.
pub trait FilterObserver {
    fn on_decision(&mut self, record: &DecisionRecord);

    fn on_fallback(&mut self, _kept: usize, _total: usize) {}
}

/// Writes every decision to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl FilterObserver for LogObserver {
    fn on_decision(&mut self, r: &DecisionRecord) {
        match r.decision {
            Decision::Kept => log::info!(
                "Kept value {} with thresholds {}, {} and mean {}",
                r.value,
                r.f_low,
                r.f_up,
                r.mean
            ),
            Decision::Removed => log::info!("Removed value {} with thresholds {}, {}", r.value, r.f_low, r.f_up),
        }
    }

    fn on_fallback(&mut self, kept: usize, total: usize) {
        log::info!("Too many points removed ({} of {} kept); using unfiltered data", kept, total);
    }
}

/// Removes samples that a heavy-tailed surrogate finds implausible.
pub struct RobustFilter {
    model: Box<dyn PosteriorModel>,
    filtered: Option<Dataset>,
    q_high: f64,
    q_low: f64,
}

impl RobustFilter {
    /// Builds the owned Student-t process from a copy of `params` with the
    /// surrogate and noise overridden.
    pub fn new<R: Rng + ?Sized>(dim: usize, params: &Parameters, rng: &mut R) -> Result<Self, FilterError> {
        let (q_high, q_low) = quantile_levels(params.up_margin_pct, params.low_margin_pct)?;

        let mut robust = params.clone();
        robust.surr_name = SurrogateKind::StudentTProcessNig;
        robust.noise = ROBUST_NOISE;
        let model = create_posterior_model(dim, &robust, rng)?;

        Ok(RobustFilter {
            model,
            filtered: None,
            q_high,
            q_low,
        })
    }

    /// Wraps an already constructed model.
    pub fn with_model(model: Box<dyn PosteriorModel>, up_margin_pct: f64, low_margin_pct: f64) -> Result<Self, FilterError> {
        let (q_high, q_low) = quantile_levels(up_margin_pct, low_margin_pct)?;
        Ok(RobustFilter {
            model,
            filtered: None,
            q_high,
            q_low,
        })
    }

    pub fn set_samples(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FilterError> {
        Ok(self.model.set_samples(x, y)?)
    }

    pub fn add_sample(&mut self, x: ArrayView1<f64>, y: f64) -> Result<(), FilterError> {
        Ok(self.model.add_sample(x, y)?)
    }

    pub fn filter_points(&mut self) -> Result<&Dataset, FilterError> {
        self.filter_points_with(&mut LogObserver)
    }

    /// Refits the model and keeps every stored sample whose target lies
    /// strictly between the `q_low` and `q_high` predictive quantiles.
    ///
    /// When half or more of the samples would be removed the unfiltered data
    /// is returned instead. On error the previous result is left untouched.
    pub fn filter_points_with(&mut self, observer: &mut dyn FilterObserver) -> Result<&Dataset, FilterError> {
        let raw = self.model.data().clone();
        let n = raw.n_samples();

        self.model.update_hyper_parameters()?;
        self.model.fit_surrogate_model()?;

        let mut filtered = Dataset::new();
        for (index, (x, value)) in raw.iter().enumerate() {
            let pd = self.model.prediction(x)?;
            let f_up = pd.quantile(self.q_high);
            let f_low = pd.quantile(self.q_low);
            let decision = classify(value, f_low, f_up);
            if decision == Decision::Kept {
                filtered.add_sample(x.to_owned(), value);
            }
            observer.on_decision(&DecisionRecord {
                index,
                value,
                f_low,
                f_up,
                decision,
                mean: pd.mean(),
            });
        }

        let kept = filtered.n_samples();
        if kept as f64 <= n as f64 * MIN_KEPT_FRACTION {
            observer.on_fallback(kept, n);
            filtered = raw;
        }

        let stored: &Dataset = self.filtered.insert(filtered);
        Ok(stored)
    }

    /// Result of the last successful filtering pass.
    pub fn filtered_data(&self) -> Option<&Dataset> {
        self.filtered.as_ref()
    }

    pub fn model(&self) -> &dyn PosteriorModel {
        self.model.as_ref()
    }

    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    pub fn q_high(&self) -> f64 {
        self.q_high
    }

    pub fn q_low(&self) -> f64 {
        self.q_low
    }
}

/// `(q_high, q_low)` for margins given in percent.
pub fn quantile_levels(up_margin_pct: f64, low_margin_pct: f64) -> Result<(f64, f64), FilterError> {
    let in_range = |m: f64| (0.0..=100.0).contains(&m);
    let q_high = (100.0 - up_margin_pct) / 100.0;
    let q_low = low_margin_pct / 100.0;
    if !in_range(up_margin_pct) || !in_range(low_margin_pct) || !(q_low < q_high) {
        return Err(FilterError::InvalidMargins {
            up: up_margin_pct,
            low: low_margin_pct,
        });
    }
    Ok((q_high, q_low))
}

/// Python‐exposed wrapper around RobustFilter
#[cfg(feature = "python")]
#[pyclass]
pub struct RobustFiltering {
    inner: RobustFilter,
}

#[cfg(feature = "python")]
#[pymethods]
impl RobustFiltering {
    #[new]
    #[pyo3(signature = (dim, up_margin=5.0, low_margin=5.0, random_state=None))]
    fn new(dim: usize, up_margin: f64, low_margin: f64, random_state: Option<u64>) -> PyResult<Self> {
        let params = Parameters {
            up_margin_pct: up_margin,
            low_margin_pct: low_margin,
            random_seed: random_state,
            ..Parameters::default()
        };
        let mut rng = params.rng();
        Ok(RobustFiltering {
            inner: RobustFilter::new(dim, &params, &mut rng)?,
        })
    }

    fn set_samples(&mut self, x: PyReadonlyArray2<f64>, y: PyReadonlyArray1<f64>) -> PyResult<()> {
        self.inner.set_samples(x.as_array(), y.as_array())?;
        Ok(())
    }

    fn add_sample(&mut self, x: PyReadonlyArray1<f64>, y: f64) -> PyResult<()> {
        self.inner.add_sample(x.as_array(), y)?;
        Ok(())
    }

    /// Returns the filtered `(X, y)`.
    fn filter_points<'py>(&mut self, py: Python<'py>) -> PyResult<(&'py PyArray2<f64>, &'py PyArray1<f64>)> {
        let dim = self.inner.dim();
        let data = self.inner.filter_points()?;
        let (x, y) = data.to_arrays(dim).map_err(FilterError::from)?;
        Ok((x.into_pyarray(py), y.into_pyarray(py)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::PredictiveDistribution;
    use crate::error::ModelError;
    use ndarray::{array, Array2};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Predicts the same distribution everywhere; can be told to fail refits.
    struct FixedModel {
        data: Dataset,
        mean: f64,
        std_dev: f64,
        fail: Arc<AtomicBool>,
        fits: usize,
    }

    impl FixedModel {
        fn boxed(mean: f64, std_dev: f64) -> (Box<dyn PosteriorModel>, Arc<AtomicBool>) {
            let fail = Arc::new(AtomicBool::new(false));
            let model = FixedModel {
                data: Dataset::new(),
                mean,
                std_dev,
                fail: fail.clone(),
                fits: 0,
            };
            (Box::new(model), fail)
        }
    }

    impl PosteriorModel for FixedModel {
        fn dim(&self) -> usize {
            1
        }

        fn data(&self) -> &Dataset {
            &self.data
        }

        fn set_samples(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
            self.data.set_samples(x, y)
        }

        fn add_sample(&mut self, x: ArrayView1<f64>, y: f64) -> Result<(), ModelError> {
            self.data.add_sample(x.to_owned(), y);
            Ok(())
        }

        fn update_hyper_parameters(&mut self) -> Result<(), ModelError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ModelError::NotPositiveDefinite { size: 0 });
            }
            Ok(())
        }

        fn fit_surrogate_model(&mut self) -> Result<(), ModelError> {
            self.fits += 1;
            Ok(())
        }

        fn prediction(&self, _x: ArrayView1<f64>) -> Result<PredictiveDistribution, ModelError> {
            if self.fits == 0 {
                return Err(ModelError::NotFitted);
            }
            PredictiveDistribution::gaussian(self.mean, self.std_dev)
        }
    }

    #[derive(Default)]
    struct Recorder {
        records: Vec<DecisionRecord>,
        fallbacks: Vec<(usize, usize)>,
    }

    impl FilterObserver for Recorder {
        fn on_decision(&mut self, record: &DecisionRecord) {
            self.records.push(record.clone());
        }

        fn on_fallback(&mut self, kept: usize, total: usize) {
            self.fallbacks.push((kept, total));
        }
    }

    fn column(values: &[f64]) -> Array2<f64> {
        Array2::from_shape_fn((values.len(), 1), |(i, _)| values[i])
    }

    #[test]
    fn classify_is_strict_on_both_bounds() {
        assert_eq!(classify(1.0, 0.5, 2.0), Decision::Kept);
        assert_eq!(classify(0.5, 0.5, 2.0), Decision::Removed);
        assert_eq!(classify(2.0, 0.5, 2.0), Decision::Removed);
        assert_eq!(classify(-3.0, 0.5, 2.0), Decision::Removed);
        assert_eq!(classify(f64::NAN, 0.5, 2.0), Decision::Removed);
        assert_eq!(classify(1.0, f64::NEG_INFINITY, f64::INFINITY), Decision::Kept);
    }

    #[test]
    fn quantile_levels_from_percentages() {
        let (q_high, q_low) = quantile_levels(10.0, 2.5).unwrap();
        assert_eq!(q_high, 0.9);
        assert_eq!(q_low, 0.025);
        assert!(quantile_levels(-1.0, 5.0).is_err());
        assert!(quantile_levels(5.0, 101.0).is_err());
        assert!(quantile_levels(60.0, 40.0).is_err());
        assert!(quantile_levels(50.0, 49.0).is_ok());
        assert!(quantile_levels(f64::NAN, 5.0).is_err());
    }

    #[test]
    fn too_many_removed_falls_back_to_raw_data() {
        // Acceptance interval is roughly (0.76, 1.74) everywhere.
        let (model, _) = FixedModel::boxed(1.25, 0.3);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        let x = column(&[0.0, 1.0, 2.0, 3.0]);
        let y = array![1.0, 5.0, 1.1, 100.0];
        filter.set_samples(x.view(), y.view()).unwrap();

        let mut rec = Recorder::default();
        let out = filter.filter_points_with(&mut rec).unwrap();
        assert_eq!(out.y(), y.as_slice().unwrap());
        assert_eq!(out.x().len(), 4);
        for (i, xi) in out.x().iter().enumerate() {
            assert_eq!(xi[0], i as f64);
        }

        let decisions: Vec<Decision> = rec.records.iter().map(|r| r.decision).collect();
        assert_eq!(
            decisions,
            vec![Decision::Kept, Decision::Removed, Decision::Kept, Decision::Removed]
        );
        assert_eq!(rec.fallbacks, vec![(2, 4)]);
        assert!(rec.records.iter().all(|r| r.mean == 1.25));
        assert_eq!(rec.records[1].index, 1);
    }

    #[test]
    fn keeps_plausible_points_in_order() {
        let (model, _) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        let targets = [0.1, -0.4, 9.0, 0.7, 0.0, -12.0, 0.3];
        for (i, &t) in targets.iter().enumerate() {
            filter.add_sample(array![i as f64].view(), t).unwrap();
        }

        let mut rec = Recorder::default();
        let out = filter.filter_points_with(&mut rec).unwrap();
        assert_eq!(out.y(), &[0.1, -0.4, 0.7, 0.0, 0.3]);
        let xs: Vec<f64> = out.x().iter().map(|x| x[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 3.0, 4.0, 6.0]);
        assert!(rec.fallbacks.is_empty());
        assert_eq!(rec.records.len(), targets.len());
    }

    #[test]
    fn targets_on_a_threshold_are_removed() {
        let dist = PredictiveDistribution::gaussian(0.0, 1.0).unwrap();
        let (model, _) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 10.0, 10.0).unwrap();
        let f_low = dist.quantile(filter.q_low());
        let f_up = dist.quantile(filter.q_high());
        let targets = [f_low, 0.0, 0.1, -0.1, 0.2, f_up];
        for (i, &t) in targets.iter().enumerate() {
            filter.add_sample(array![i as f64].view(), t).unwrap();
        }

        let out = filter.filter_points().unwrap();
        assert_eq!(out.y(), &[0.0, 0.1, -0.1, 0.2]);
    }

    #[test]
    fn exactly_half_kept_triggers_fallback() {
        let (model, _) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        let x = column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = array![0.0, 0.2, 0.1, 50.0, 60.0, 70.0];
        filter.set_samples(x.view(), y.view()).unwrap();
        assert_eq!(filter.filter_points().unwrap().n_samples(), 6);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let (model, _) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        assert!(filter.filtered_data().is_none());

        let mut rec = Recorder::default();
        let out = filter.filter_points_with(&mut rec).unwrap();
        assert!(out.is_empty());
        assert!(rec.records.is_empty());
        assert_eq!(rec.fallbacks, vec![(0, 0)]);
    }

    #[test]
    fn failed_refit_keeps_previous_result() {
        let (model, fail) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        let x = column(&[0.0, 1.0, 2.0]);
        let y = array![0.0, 0.5, 40.0];
        filter.set_samples(x.view(), y.view()).unwrap();
        let before = filter.filter_points().unwrap().clone();
        assert_eq!(before.n_samples(), 2);

        filter.add_sample(array![3.0].view(), 0.1).unwrap();
        fail.store(true, Ordering::SeqCst);
        let err = filter.filter_points().unwrap_err();
        assert!(matches!(err, FilterError::Model(ModelError::NotPositiveDefinite { .. })));
        assert_eq!(filter.filtered_data(), Some(&before));
    }

    #[test]
    fn sample_changes_need_a_new_pass() {
        let (model, _) = FixedModel::boxed(0.0, 1.0);
        let mut filter = RobustFilter::with_model(model, 5.0, 5.0).unwrap();
        filter.add_sample(array![0.0].view(), 0.0).unwrap();
        filter.filter_points().unwrap();
        filter.add_sample(array![1.0].view(), 0.5).unwrap();

        assert_eq!(filter.filtered_data().unwrap().n_samples(), 1);
        assert_eq!(filter.model().data().n_samples(), 2);
        assert_eq!(filter.filter_points().unwrap().n_samples(), 2);
    }

    #[test]
    fn new_forces_heavy_tailed_model() {
        let params = Parameters {
            surr_name: SurrogateKind::GaussianProcess,
            noise: 0.5,
            ..Parameters::default()
        };
        let mut rng = params.rng();
        let mut filter = RobustFilter::new(2, &params, &mut rng).unwrap();
        assert_eq!(filter.dim(), 2);
        assert_eq!(filter.q_high(), 0.95);
        assert_eq!(filter.q_low(), 0.05);

        for i in 0..6 {
            let t = i as f64;
            filter.add_sample(array![t, 0.5 * t].view(), t.cos()).unwrap();
        }
        filter.filter_points().unwrap();
        let pd = filter.model().prediction(array![0.0, 0.0].view()).unwrap();
        assert!(pd.degrees_of_freedom().is_some());
    }

    #[test]
    fn new_rejects_bad_margins_and_dims() {
        let mut rng = Parameters::default().rng();
        let params = Parameters {
            up_margin_pct: 70.0,
            low_margin_pct: 40.0,
            ..Parameters::default()
        };
        assert!(matches!(
            RobustFilter::new(1, &params, &mut rng),
            Err(FilterError::InvalidMargins { .. })
        ));
        assert!(matches!(
            RobustFilter::new(0, &Parameters::default(), &mut rng),
            Err(FilterError::Model(ModelError::InvalidParameter { name: "dim", .. }))
        ));
    }
}
