use statrs::distribution::{Continuous, ContinuousCDF, Normal, StudentsT};

use crate::error::ModelError;

/// Predictive distribution returned by a posterior model for one query point.
#[derive(Debug, Clone, Copy)]
pub struct PredictiveDistribution {
    mean: f64,
    scale: f64,
    shape: Shape,
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Gaussian(Normal),
    StudentT { dist: StudentsT, dof: f64 },
}

impl PredictiveDistribution {
    pub fn gaussian(mean: f64, std_dev: f64) -> Result<Self, ModelError> {
        let dist = Normal::new(mean, std_dev).map_err(|e| ModelError::Distribution(e.to_string()))?;
        Ok(PredictiveDistribution {
            mean,
            scale: std_dev,
            shape: Shape::Gaussian(dist),
        })
    }

    /// Location-scale Student-t with `dof` degrees of freedom.
    pub fn student_t(location: f64, scale: f64, dof: f64) -> Result<Self, ModelError> {
        let dist = StudentsT::new(location, scale, dof).map_err(|e| ModelError::Distribution(e.to_string()))?;
        Ok(PredictiveDistribution {
            mean: location,
            scale,
            shape: Shape::StudentT { dist, dof },
        })
    }

    /// Inverse CDF. `p ≤ 0` maps to `−∞` and `p ≥ 1` to `+∞`.
    pub fn quantile(&self, p: f64) -> f64 {
        if p.is_nan() {
            return f64::NAN;
        }
        if p <= 0.0 {
            return f64::NEG_INFINITY;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        match &self.shape {
            Shape::Gaussian(d) => d.inverse_cdf(p),
            Shape::StudentT { dist, .. } => dist.inverse_cdf(p),
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Standard deviation; infinite for a Student-t with `dof ≤ 2`.
    pub fn std_dev(&self) -> f64 {
        match self.shape {
            Shape::Gaussian(_) => self.scale,
            Shape::StudentT { dof, .. } if dof > 2.0 => self.scale * (dof / (dof - 2.0)).sqrt(),
            Shape::StudentT { .. } => f64::INFINITY,
        }
    }

    pub fn degrees_of_freedom(&self) -> Option<f64> {
        match self.shape {
            Shape::Gaussian(_) => None,
            Shape::StudentT { dof, .. } => Some(dof),
        }
    }

    pub fn pdf(&self, y: f64) -> f64 {
        match &self.shape {
            Shape::Gaussian(d) => d.pdf(y),
            Shape::StudentT { dist, .. } => dist.pdf(y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gaussian_quantiles_are_symmetric() {
        let d = PredictiveDistribution::gaussian(2.0, 0.5).unwrap();
        let lo = d.quantile(0.05);
        let hi = d.quantile(0.95);
        assert_abs_diff_eq!(d.mean() - lo, hi - d.mean(), epsilon = 1e-9);
        assert_abs_diff_eq!(hi, 2.0 + 1.644_853_626_951 * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn student_t_has_heavier_tails_than_gaussian() {
        let g = PredictiveDistribution::gaussian(0.0, 1.0).unwrap();
        let t = PredictiveDistribution::student_t(0.0, 1.0, 3.0).unwrap();
        assert!(t.quantile(0.99) > g.quantile(0.99));
        assert!(t.quantile(0.01) < g.quantile(0.01));
        assert_abs_diff_eq!(t.std_dev(), 3f64.sqrt(), epsilon = 1e-12);
        assert_eq!(t.degrees_of_freedom(), Some(3.0));
    }

    #[test]
    fn extreme_levels_are_unbounded() {
        let t = PredictiveDistribution::student_t(1.0, 2.0, 5.0).unwrap();
        assert_eq!(t.quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(t.quantile(1.0), f64::INFINITY);
        assert!(t.quantile(f64::NAN).is_nan());
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(PredictiveDistribution::student_t(0.0, 0.0, 4.0).is_err());
        assert!(PredictiveDistribution::gaussian(0.0, -1.0).is_err());
    }

    #[test]
    fn low_dof_has_infinite_std_dev() {
        let t = PredictiveDistribution::student_t(0.0, 1.0, 2.0).unwrap();
        assert_eq!(t.std_dev(), f64::INFINITY);
        assert!(t.pdf(0.0) > t.pdf(1.0));
    }
}
