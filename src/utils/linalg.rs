use nalgebra::{DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, ArrayView1};

use crate::error::ModelError;

/// Diagonal jitter tried, in order, when a plain factorisation fails.
const JITTER_LADDER: [f64; 5] = [1e-10, 1e-9, 1e-8, 1e-7, 1e-6];

/// Cholesky factorisation `A = L Lᵀ` of a symmetric positive definite
/// `ndarray` matrix, backed by `nalgebra`.
#[derive(Debug, Clone)]
pub struct Cholesky {
    chol: nalgebra::Cholesky<f64, Dyn>,
}

impl Cholesky {
    pub fn factor(a: &Array2<f64>) -> Result<Self, ModelError> {
        let n = a.nrows();
        let m = DMatrix::from_fn(n, n, |i, j| a[[i, j]]);
        nalgebra::Cholesky::new(m)
            .map(|chol| Cholesky { chol })
            .ok_or(ModelError::NotPositiveDefinite { size: n })
    }

    /// Like [`Cholesky::factor`], retrying with growing diagonal jitter.
    pub fn factor_with_jitter(a: &Array2<f64>) -> Result<Self, ModelError> {
        let mut last = match Self::factor(a) {
            Ok(chol) => return Ok(chol),
            Err(e) => e,
        };

        for &jitter in JITTER_LADDER.iter() {
            log::warn!("Cholesky factorisation failed ({}), retrying with jitter {:e}", last, jitter);
            let mut jittered = a.clone();
            jittered.diag_mut().mapv_inplace(|d| d + jitter);
            match Self::factor(&jittered) {
                Ok(chol) => return Ok(chol),
                Err(e) => last = e,
            }
        }

        Err(last)
    }

    pub fn dim(&self) -> usize {
        self.chol.l_dirty().nrows()
    }

    /// The lower-triangular factor `L`.
    pub fn lower(&self) -> Array2<f64> {
        let l = self.chol.l();
        Array2::from_shape_fn((l.nrows(), l.ncols()), |(i, j)| l[(i, j)])
    }

    /// Solves `A x = b`.
    pub fn solve(&self, b: ArrayView1<f64>) -> Array1<f64> {
        let rhs = DVector::from_iterator(b.len(), b.iter().copied());
        let x = self.chol.solve(&rhs);
        x.iter().copied().collect()
    }

    /// `ln |A|`
    pub fn log_det(&self) -> f64 {
        self.chol.ln_determinant()
    }
}
