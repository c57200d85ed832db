//! Outlier policies
//!
//! ## Adaptive Noise
//!
//! ```text
//! m = |ν|
//! factor = 1                                   if m ≤ τ
//!        = min(1 + gain·(m − τ)/τ, max)        otherwise
//! R' = factor·R
//! ```
//!
//! Every fix is applied, but a fix that disagrees with the prediction pulls
//! the state less. With the default constants a 5 m jump on a converged track
//! moves the estimate by roughly 4% of the jump.
//!
//! ## Gated
//!
//! ```text
//! d² = νᵀ·S⁻¹·ν   with S = H·P·Hᵀ + R
//! d² > χ²(2 dof, 99%) = 9.21  → reject, output the prediction
//! ```
//!
//! A run of rejections long enough means the track, not the fix, is wrong;
//! after `max_consecutive_rejections` the next fix re-seeds the state.

use crate::{
    constants::filter::{
        ADAPTIVE_INFLATION_GAIN, ADAPTIVE_INNOVATION_THRESHOLD_M, ADAPTIVE_MAX_INFLATION,
        CHI_SQUARE_2DOF_99, MAX_CONSECUTIVE_REJECTIONS,
    },
    errors::{TrackError, TrackResult},
    geometry::Point2,
};

use super::{
    step_with, Decision, FilterState, FilterStep, Innovation, NoiseConfig, StateFilter,
};

/// Adaptive-noise policy parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdaptiveConfig {
    /// Innovation magnitude τ below which R is left alone (m)
    pub innovation_threshold_m: f64,
    /// Inflation slope per threshold of excess innovation
    pub inflation_gain: f64,
    /// Upper bound on the inflation factor
    pub max_inflation: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            innovation_threshold_m: ADAPTIVE_INNOVATION_THRESHOLD_M,
            inflation_gain: ADAPTIVE_INFLATION_GAIN,
            max_inflation: ADAPTIVE_MAX_INFLATION,
        }
    }
}

impl AdaptiveConfig {
    /// Set the innovation threshold
    pub fn with_threshold(mut self, threshold_m: f64) -> Self {
        self.innovation_threshold_m = threshold_m.max(f64::EPSILON);
        self
    }

    /// Set the inflation cap
    pub fn with_max_inflation(mut self, max_inflation: f64) -> Self {
        self.max_inflation = max_inflation.max(1.0);
        self
    }

    /// Inflation factor for an innovation of `magnitude_m`
    pub fn inflation(&self, magnitude_m: f64) -> f64 {
        let tau = self.innovation_threshold_m;
        if !(magnitude_m > tau) {
            return 1.0;
        }
        (1.0 + self.inflation_gain * (magnitude_m - tau) / tau).min(self.max_inflation)
    }
}

/// Kalman filter with innovation-adaptive measurement noise
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdaptiveNoiseFilter {
    noise: NoiseConfig,
    config: AdaptiveConfig,
}

impl AdaptiveNoiseFilter {
    /// Create the filter
    pub fn new(noise: NoiseConfig, config: AdaptiveConfig) -> Self {
        Self { noise, config }
    }

    /// Policy parameters
    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    fn decide(&self, innovation: &Innovation) -> Decision {
        let factor = self.config.inflation(innovation.magnitude());
        if factor > 1.0 {
            Decision::Inflate(factor)
        } else {
            Decision::Accept
        }
    }
}

impl StateFilter for AdaptiveNoiseFilter {
    fn advance(&self, state: &FilterState, measurement: Option<Point2>, dt_s: f64) -> FilterStep {
        step_with(&self.noise, state, measurement, dt_s, |innovation, _| {
            Ok(self.decide(innovation))
        })
    }

    fn seed(&self, position: Point2) -> FilterState {
        FilterState::seeded(position, self.noise.initial_variance)
    }
}

/// Gate parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateConfig {
    /// Squared Mahalanobis distance above which a fix is rejected
    pub chi_square_threshold: f64,
    /// Rejections in a row that force a re-seed
    pub max_consecutive_rejections: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            chi_square_threshold: CHI_SQUARE_2DOF_99,
            max_consecutive_rejections: MAX_CONSECUTIVE_REJECTIONS,
        }
    }
}

impl GateConfig {
    /// Set the gate threshold
    pub fn with_threshold(mut self, chi_square_threshold: f64) -> Self {
        self.chi_square_threshold = chi_square_threshold;
        self
    }

    /// Set the re-seed limit
    pub fn with_max_rejections(mut self, max_consecutive_rejections: u32) -> Self {
        self.max_consecutive_rejections = max_consecutive_rejections.max(1);
        self
    }

    /// Pass the innovation through the gate, returning its d²
    pub fn check(&self, innovation: &Innovation) -> TrackResult<f64> {
        let d2 = innovation.mahalanobis_sq()?;
        if d2 > self.chi_square_threshold {
            return Err(TrackError::OutlierMeasurement {
                distance: d2,
                threshold: self.chi_square_threshold,
            });
        }
        Ok(d2)
    }
}

/// Kalman filter with a χ² innovation gate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GatedFilter {
    noise: NoiseConfig,
    config: GateConfig,
}

impl GatedFilter {
    /// Create the filter
    pub fn new(noise: NoiseConfig, config: GateConfig) -> Self {
        Self { noise, config }
    }

    /// Gate parameters
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    fn decide(&self, innovation: &Innovation, state: &FilterState) -> TrackResult<Decision> {
        match self.config.check(innovation) {
            Ok(_) => Ok(Decision::Accept),
            Err(TrackError::OutlierMeasurement { distance, .. }) => {
                if state.consecutive_rejections >= self.config.max_consecutive_rejections {
                    Ok(Decision::Reseed)
                } else {
                    Ok(Decision::Reject {
                        mahalanobis_sq: distance,
                    })
                }
            }
            Err(err) => Err(err),
        }
    }
}

impl StateFilter for GatedFilter {
    fn advance(&self, state: &FilterState, measurement: Option<Point2>, dt_s: f64) -> FilterStep {
        step_with(&self.noise, state, measurement, dt_s, |innovation, prior| {
            self.decide(innovation, prior)
        })
    }

    fn seed(&self, position: Point2) -> FilterState {
        FilterState::seeded(position, self.noise.initial_variance)
    }
}
