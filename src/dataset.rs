use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::ModelError;

/// Ordered pairs of input vectors and scalar targets.
///
/// Also tracks the positions of the smallest and largest targets, which
/// an optimisation loop reports as its incumbent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    x: Vec<Array1<f64>>,
    y: Vec<f64>,
    min_index: usize,
    max_index: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// One sample per row of `x`.
    pub fn from_arrays(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self, ModelError> {
        let mut data = Dataset::new();
        data.set_samples(x, y)?;
        Ok(data)
    }

    pub fn set_samples(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::Shape {
                rows: x.nrows(),
                targets: y.len(),
            });
        }
        self.clear();
        for (row, &target) in x.rows().into_iter().zip(y.iter()) {
            self.add_sample(row.to_owned(), target);
        }
        Ok(())
    }

    pub fn add_sample(&mut self, x: Array1<f64>, y: f64) {
        let idx = self.y.len();
        self.x.push(x);
        self.y.push(y);

        if idx == 0 {
            self.min_index = 0;
            self.max_index = 0;
        } else {
            if y < self.y[self.min_index] {
                self.min_index = idx;
            }
            if y > self.y[self.max_index] {
                self.max_index = idx;
            }
        }
    }

    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.min_index = 0;
        self.max_index = 0;
    }

    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn x(&self) -> &[Array1<f64>] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn sample(&self, i: usize) -> Option<(ArrayView1<'_, f64>, f64)> {
        Some((self.x.get(i)?.view(), *self.y.get(i)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<'_, f64>, f64)> + '_ {
        self.x.iter().map(|x| x.view()).zip(self.y.iter().copied())
    }

    pub fn min_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.min_index)
    }

    pub fn max_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.max_index)
    }

    pub fn value_at_minimum(&self) -> Option<f64> {
        self.min_index().map(|i| self.y[i])
    }

    pub fn point_at_minimum(&self) -> Option<ArrayView1<'_, f64>> {
        self.min_index().map(|i| self.x[i].view())
    }

    pub fn value_at_maximum(&self) -> Option<f64> {
        self.max_index().map(|i| self.y[i])
    }

    /// Targets as an owned vector.
    pub fn targets(&self) -> Array1<f64> {
        Array1::from(self.y.clone())
    }

    /// Stacks the inputs into an `n × dim` matrix.
    pub fn to_arrays(&self, dim: usize) -> Result<(Array2<f64>, Array1<f64>), ModelError> {
        let mut out = Array2::<f64>::zeros((self.n_samples(), dim));
        for (mut row, x) in out.rows_mut().into_iter().zip(self.x.iter()) {
            if x.len() != dim {
                return Err(ModelError::Dimension {
                    expected: dim,
                    found: x.len(),
                });
            }
            row.assign(x);
        }
        Ok((out, self.targets()))
    }
}
