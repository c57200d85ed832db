//! One-dimensional Gaussian-process regression
//!
//! Fits `y(t)` over normalised time with zero-mean, unit-variance targets.
//! The length-scale is picked from the kernel's candidate grid by maximising
//! the log marginal likelihood
//!
//! ```text
//! log p(y | t, ℓ) = −½ yᵀ K⁻¹ y − ½ log |K| − n/2 log 2π
//! ```
//!
//! and the posterior mean at `t*` is `k*ᵀ K⁻¹ y`, mapped back to the
//! original scale.

use alloc::vec::Vec;

use uwbtrack_core::{TrackError, TrackResult};

use crate::{kernel::KernelConfig, linalg::Cholesky};

const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// Standard deviation below which targets count as constant
const MIN_TARGET_STD: f64 = 1e-9;

/// Trained single-output GP
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianProcess {
    kernel: KernelConfig,
    length_scale: f64,
    inputs: Vec<f64>,
    alpha: Vec<f64>,
    target_mean: f64,
    target_std: f64,
    log_marginal_likelihood: f64,
}

struct Fit {
    length_scale: f64,
    alpha: Vec<f64>,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    /// Fit to `(inputs[i], targets[i])` pairs
    ///
    /// Fails with `PredictionUnavailable` on empty or mismatched input and
    /// `SingularMatrix` if no candidate length-scale gives a positive
    /// definite covariance.
    pub fn fit(kernel: KernelConfig, inputs: &[f64], targets: &[f64]) -> TrackResult<Self> {
        if inputs.is_empty() || inputs.len() != targets.len() {
            return Err(TrackError::PredictionUnavailable {
                reason: "no training data",
            });
        }
        if !inputs.iter().chain(targets).all(|v| v.is_finite()) {
            return Err(TrackError::PredictionUnavailable {
                reason: "non-finite training data",
            });
        }

        let n = targets.len() as f64;
        let target_mean = targets.iter().sum::<f64>() / n;
        let variance = targets.iter().map(|y| (y - target_mean) * (y - target_mean)).sum::<f64>() / n;
        let target_std = match libm::sqrt(variance) {
            std if std > MIN_TARGET_STD => std,
            _ => 1.0,
        };
        let normalised: Vec<f64> = targets.iter().map(|y| (y - target_mean) / target_std).collect();

        let mut best: Option<Fit> = None;
        for length_scale in kernel.length_scale_candidates() {
            let Some(fit) = Self::fit_length(&kernel, inputs, &normalised, length_scale) else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |b| fit.log_marginal_likelihood > b.log_marginal_likelihood)
            {
                best = Some(fit);
            }
        }
        let best = best.ok_or(TrackError::SingularMatrix)?;

        Ok(Self {
            kernel,
            length_scale: best.length_scale,
            inputs: inputs.to_vec(),
            alpha: best.alpha,
            target_mean,
            target_std,
            log_marginal_likelihood: best.log_marginal_likelihood,
        })
    }

    fn fit_length(kernel: &KernelConfig, inputs: &[f64], targets: &[f64], length_scale: f64) -> Option<Fit> {
        let n = inputs.len();
        let mut k = alloc::vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let value = kernel.covariance(inputs[i], inputs[j], length_scale);
                k[i * n + j] = value;
                k[j * n + i] = value;
            }
            k[i * n + i] += kernel.diagonal_noise();
        }

        let chol = Cholesky::factor(&k, n)?;
        let alpha = chol.solve(targets);
        let fit_term: f64 = targets.iter().zip(&alpha).map(|(y, a)| y * a).sum();
        let log_marginal_likelihood = -0.5 * fit_term - 0.5 * chol.log_determinant() - 0.5 * n as f64 * LOG_2PI;

        log_marginal_likelihood.is_finite().then_some(Fit {
            length_scale,
            alpha,
            log_marginal_likelihood,
        })
    }

    /// Posterior mean at `input`
    pub fn predict(&self, input: f64) -> f64 {
        let normalised: f64 = self
            .inputs
            .iter()
            .zip(&self.alpha)
            .map(|(x, a)| self.kernel.covariance(input, *x, self.length_scale) * a)
            .sum();
        self.target_mean + normalised * self.target_std
    }

    /// Selected length-scale
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Log marginal likelihood at the selected length-scale
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    /// Number of training points
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the model has no training points
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
