//! Covariance kernels
//!
//! Stationary kernels over normalised time. The Matérn ν = 3/2 kernel is
//! once differentiable, so sample paths can turn sharply, which suits
//! players changing direction. The squared-exponential (RBF) kernel gives
//! smoother paths for slower contexts.
//!
//! ```text
//! Matérn 3/2:  k(r) = σ² (1 + √3 r/ℓ) exp(−√3 r/ℓ)
//! RBF:         k(r) = σ² exp(−r² / 2ℓ²)
//! ```
//!
//! A white-noise term is added on the diagonal of the training covariance.

/// Initial Matérn length-scale in normalised time
pub const MATERN_LENGTH_SCALE: f64 = 0.5;

/// Initial RBF length-scale in normalised time
pub const RBF_LENGTH_SCALE: f64 = 0.3;

/// Observation noise level, on normalised targets
pub const WHITE_NOISE_LEVEL: f64 = 0.01;

/// Diagonal jitter added for numerical stability
pub const DIAGONAL_JITTER: f64 = 1e-5;

/// Lower bound of the length-scale search
pub const LENGTH_SCALE_MIN: f64 = 1e-3;

/// Upper bound of the length-scale search
pub const LENGTH_SCALE_MAX: f64 = 25.0;

/// Number of log-spaced length-scales tried on each fit
pub const LENGTH_SCALE_GRID: usize = 12;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Kernel family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KernelKind {
    /// Matérn with ν = 3/2
    Matern32,
    /// Squared exponential
    Rbf,
}

impl KernelKind {
    /// Correlation at distance `r` for length-scale `length`, in `[0, 1]`
    pub fn correlation(&self, r: f64, length: f64) -> f64 {
        let scaled = libm::fabs(r) / length;
        match self {
            KernelKind::Matern32 => {
                let s = SQRT_3 * scaled;
                (1.0 + s) * libm::exp(-s)
            }
            KernelKind::Rbf => libm::exp(-0.5 * scaled * scaled),
        }
    }
}

/// Kernel hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelConfig {
    /// Kernel family
    pub kind: KernelKind,
    /// Starting length-scale, always part of the search grid
    pub length_scale: f64,
    /// Signal variance σ²
    pub signal_variance: f64,
    /// White-noise variance
    pub noise_level: f64,
    /// Diagonal jitter α
    pub jitter: f64,
    /// Length-scale search range; equal bounds fix the length-scale
    pub length_scale_bounds: (f64, f64),
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::matern()
    }
}

impl KernelConfig {
    /// Matérn 3/2 plus white noise, tuned for sports motion
    pub fn matern() -> Self {
        Self {
            kind: KernelKind::Matern32,
            length_scale: MATERN_LENGTH_SCALE,
            signal_variance: 1.0,
            noise_level: WHITE_NOISE_LEVEL,
            jitter: DIAGONAL_JITTER,
            length_scale_bounds: (LENGTH_SCALE_MIN, LENGTH_SCALE_MAX),
        }
    }

    /// RBF plus white noise
    pub fn rbf() -> Self {
        Self {
            kind: KernelKind::Rbf,
            length_scale: RBF_LENGTH_SCALE,
            ..Self::matern()
        }
    }

    /// Set the starting length-scale
    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }

    /// Set the white-noise variance
    pub fn with_noise_level(mut self, noise_level: f64) -> Self {
        self.noise_level = noise_level.max(0.0);
        self
    }

    /// Fix the length-scale instead of searching for it
    pub fn fixed(mut self) -> Self {
        self.length_scale_bounds = (self.length_scale, self.length_scale);
        self
    }

    /// Covariance between two inputs, without the noise term
    pub fn covariance(&self, a: f64, b: f64, length: f64) -> f64 {
        self.signal_variance * self.kind.correlation(a - b, length)
    }

    /// Added to the diagonal of the training covariance
    pub fn diagonal_noise(&self) -> f64 {
        self.noise_level + self.jitter
    }

    /// Length-scales to try: the starting value plus a log-spaced grid
    pub fn length_scale_candidates(&self) -> impl Iterator<Item = f64> + '_ {
        let (low, high) = self.length_scale_bounds;
        let low = low.max(f64::MIN_POSITIVE);
        let high = high.max(low);
        let fixed = high <= low;
        let ratio = libm::log(high / low);
        let grid = (0..LENGTH_SCALE_GRID)
            .filter(move |_| !fixed)
            .map(move |i| low * libm::exp(ratio * i as f64 / (LENGTH_SCALE_GRID - 1) as f64));
        core::iter::once(self.length_scale.clamp(low, high)).chain(grid)
    }
}
