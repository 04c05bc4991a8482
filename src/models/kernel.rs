use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Isotropic stationary correlation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    SquaredExponential,
    MaternIso3,
    #[default]
    MaternIso5,
}

impl KernelKind {
    /// Correlation at scaled distance `r = ‖a − b‖ / ℓ`.
    pub fn correlation_at(self, r: f64) -> f64 {
        match self {
            KernelKind::SquaredExponential => (-0.5 * r * r).exp(),
            KernelKind::MaternIso3 => {
                let s = 3f64.sqrt() * r;
                (1.0 + s) * (-s).exp()
            }
            KernelKind::MaternIso5 => {
                let s = 5f64.sqrt() * r;
                (1.0 + s + s * s / 3.0) * (-s).exp()
            }
        }
    }

    pub fn correlation(self, a: ArrayView1<f64>, b: ArrayView1<f64>, length_scale: f64) -> f64 {
        self.correlation_at(euclidean_distance(a, b) / length_scale)
    }
}

fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// `R + noise·I` over all stored inputs.
pub fn correlation_matrix(kind: KernelKind, xs: &[Array1<f64>], length_scale: f64, noise: f64) -> Array2<f64> {
    let n = xs.len();
    let mut k = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        k[[i, i]] = 1.0 + noise;
        for j in 0..i {
            let c = kind.correlation(xs[i].view(), xs[j].view(), length_scale);
            k[[i, j]] = c;
            k[[j, i]] = c;
        }
    }
    k
}

/// Correlations between every stored input and `query`.
pub fn cross_correlation(kind: KernelKind, xs: &[Array1<f64>], query: ArrayView1<f64>, length_scale: f64) -> Array1<f64> {
    xs.iter()
        .map(|x| kind.correlation(x.view(), query, length_scale))
        .collect()
}
