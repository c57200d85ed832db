//! Dense symmetric solves for GP regression
//!
//! Row-major `n × n` matrices in a flat `Vec<f64>`. The training window is
//! at most a few dozen samples, so plain Cholesky is all that is needed.

use alloc::vec::Vec;

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Cholesky {
    n: usize,
    l: Vec<f64>,
}

impl Cholesky {
    /// Factor the row-major `n × n` matrix `a`
    ///
    /// Returns `None` if `a` is not positive definite
    pub fn factor(a: &[f64], n: usize) -> Option<Self> {
        if a.len() != n * n {
            return None;
        }
        let mut l = alloc::vec![0.0; n * n];
        for j in 0..n {
            let mut diag = a[j * n + j];
            for k in 0..j {
                diag -= l[j * n + k] * l[j * n + k];
            }
            if !(diag > 0.0) {
                return None;
            }
            let pivot = libm::sqrt(diag);
            l[j * n + j] = pivot;

            for i in (j + 1)..n {
                let mut sum = a[i * n + j];
                for k in 0..j {
                    sum -= l[i * n + k] * l[j * n + k];
                }
                l[i * n + j] = sum / pivot;
            }
        }
        Some(Self { n, l })
    }

    /// Dimension
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `A x = b` via `L y = b`, `Lᵀ x = y`
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut y = alloc::vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.l[i * n + k] * y[k];
            }
            y[i] = sum / self.l[i * n + i];
        }

        let mut x = alloc::vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= self.l[k * n + i] * x[k];
            }
            x[i] = sum / self.l[i * n + i];
        }
        x
    }

    /// `log |A|`
    pub fn log_determinant(&self) -> f64 {
        (0..self.n).map(|i| 2.0 * libm::log(self.l[i * self.n + i])).sum()
    }
}
