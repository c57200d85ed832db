//! State Filter
//!
//! ## Overview
//!
//! Smooths the raw multilateration fixes of one tag with a constant-velocity
//! Kalman filter and decides what to do with fixes that disagree with the
//! predicted motion. Two update policies are available:
//!
//! | Policy | Outlier handling | Output |
//! |--------|------------------|--------|
//! | [`AdaptiveNoiseFilter`] | inflates R in proportion to the innovation | always Measured |
//! | [`GatedFilter`] | χ² gate on the Mahalanobis distance | Predicted when rejected |
//!
//! ## Step Semantics
//!
//! ```text
//! advance(state, z | None, Δt)
//!   ├─ not initialized, z present  → seed at z, velocity 0, P = P0·I
//!   ├─ Δt > 0                      → predict over Δt
//!   ├─ z absent / non-finite       → predicted state, source Predicted
//!   └─ z present                   → policy decides: accept, downweight, reject
//! ```
//!
//! `Δt ≤ 0` skips the prediction and only applies the update, so duplicate
//! timestamps never advance the state in time.
//!
//! After every update the covariance is symmetrized and checked for positive
//! semi-definiteness. A failed check re-seeds the state at the current fix
//! (or inflates the covariance when there is none) and logs the event.

pub mod kalman;
pub mod policy;

pub use kalman::{ConstantVelocityModel, Innovation};
pub use policy::{AdaptiveConfig, AdaptiveNoiseFilter, GateConfig, GatedFilter};

use crate::{
    constants::filter::{
        DEFAULT_MEASUREMENT_VARIANCE_M2, DEFAULT_PROCESS_NOISE_DENSITY, INITIAL_VARIANCE,
        PSD_TOLERANCE,
    },
    errors::TrackResult,
    frame::{FilteredSample, FrameSource},
    geometry::Point2,
    macros::{log_debug, log_warn},
    matrix::{identity, is_positive_semidefinite, scale, SquareMatrix, Vector},
    time::Timestamp,
    tracking::TrackState,
};

use kalman::STATE_DIM;

/// Filter state of one tag
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterState {
    /// Estimated position (m)
    pub position: Point2,
    /// Estimated velocity (m/s)
    pub velocity: Point2,
    /// Covariance of `[px, py, vx, vy]`
    pub covariance: SquareMatrix<STATE_DIM>,
    /// Whether a first fix has seeded the state
    pub initialized: bool,
    /// Consecutive fixes rejected by the gate
    pub consecutive_rejections: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    /// Unseeded state
    pub fn new() -> Self {
        Self {
            position: Point2::ZERO,
            velocity: Point2::ZERO,
            covariance: [[0.0; STATE_DIM]; STATE_DIM],
            initialized: false,
            consecutive_rejections: 0,
        }
    }

    /// State seeded at `position` with zero velocity and `P = variance·I`
    pub fn seeded(position: Point2, variance: f64) -> Self {
        Self {
            position,
            velocity: Point2::ZERO,
            covariance: scale(&identity::<STATE_DIM>(), variance),
            initialized: true,
            consecutive_rejections: 0,
        }
    }

    /// Position standard deviation, the root of the mean position variance (m)
    pub fn position_sigma(&self) -> f64 {
        libm::sqrt(((self.covariance[0][0] + self.covariance[1][1]) * 0.5).max(0.0))
    }

    fn vector(&self) -> Vector<STATE_DIM> {
        [self.position.x, self.position.y, self.velocity.x, self.velocity.y]
    }

    fn with_vector(&self, x: Vector<STATE_DIM>, covariance: SquareMatrix<STATE_DIM>) -> Self {
        Self {
            position: Point2::new(x[0], x[1]),
            velocity: Point2::new(x[2], x[3]),
            covariance,
            initialized: true,
            consecutive_rejections: self.consecutive_rejections,
        }
    }
}

/// What happened to the measurement of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Measurement applied with nominal noise
    Accepted,
    /// Measurement applied with inflated noise
    Downweighted {
        /// Factor applied to R
        factor: f64,
    },
    /// Measurement discarded by the gate
    Rejected {
        /// Squared Mahalanobis distance of the innovation
        mahalanobis_sq: f64,
    },
    /// State (re)initialized at the measurement
    Seeded,
    /// No usable measurement; prediction only
    NoMeasurement,
}

/// Result of one filter step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStep {
    /// Updated state
    pub state: FilterState,
    /// Whether the output reflects a measurement or only the motion model
    pub source: FrameSource,
    /// Fate of the step's measurement
    pub outcome: UpdateOutcome,
}

impl FilterStep {
    /// Output sample at `timestamp_ms`, `None` until the state is seeded
    pub fn sample(&self, timestamp_ms: Timestamp, track_state: TrackState) -> Option<FilteredSample> {
        self.state.initialized.then_some(FilteredSample {
            timestamp_ms,
            position: self.state.position,
            velocity: self.state.velocity,
            source: self.source,
            track_state,
        })
    }
}

/// Decision of an update policy on one innovation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Apply with nominal R
    Accept,
    /// Apply with R scaled by the factor
    Inflate(f64),
    /// Discard
    Reject {
        /// Squared Mahalanobis distance that failed the gate
        mahalanobis_sq: f64,
    },
    /// Too many consecutive rejections; restart the track at the fix
    Reseed,
}

/// Per-tag state filter
///
/// Implementations are stateless; the per-tag state travels in
/// [`FilterState`] so one filter serves any number of tags.
pub trait StateFilter {
    /// Advance `state` by `dt_s` seconds and fold in `measurement`
    fn advance(&self, state: &FilterState, measurement: Option<Point2>, dt_s: f64) -> FilterStep;

    /// Fresh state seeded at `position`
    fn seed(&self, position: Point2) -> FilterState;
}

/// Noise parameters shared by every policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseConfig {
    /// Acceleration noise spectral density q (m²/s³)
    pub process_noise_density: f64,
    /// Measurement variance per axis (m²)
    pub measurement_variance: f64,
    /// Diagonal of the seed covariance
    pub initial_variance: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            process_noise_density: DEFAULT_PROCESS_NOISE_DENSITY,
            measurement_variance: DEFAULT_MEASUREMENT_VARIANCE_M2,
            initial_variance: INITIAL_VARIANCE,
        }
    }
}

impl NoiseConfig {
    fn model(&self) -> ConstantVelocityModel {
        ConstantVelocityModel::new(self.process_noise_density, self.measurement_variance)
    }
}

/// Update policy selection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdatePolicy {
    /// Innovation-adaptive measurement noise
    Adaptive(AdaptiveConfig),
    /// χ² innovation gate
    Gated(GateConfig),
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::Adaptive(AdaptiveConfig::default())
    }
}

/// Filter configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterConfig {
    /// Noise parameters
    pub noise: NoiseConfig,
    /// Outlier policy
    pub policy: UpdatePolicy,
}

impl FilterConfig {
    /// Adaptive policy with default parameters
    pub fn adaptive() -> Self {
        Self {
            noise: NoiseConfig::default(),
            policy: UpdatePolicy::Adaptive(AdaptiveConfig::default()),
        }
    }

    /// Gated policy with default parameters
    pub fn gated() -> Self {
        Self {
            noise: NoiseConfig::default(),
            policy: UpdatePolicy::Gated(GateConfig::default()),
        }
    }

    /// Set the process noise density
    pub fn with_process_noise(mut self, density: f64) -> Self {
        self.noise.process_noise_density = density;
        self
    }

    /// Set the measurement variance
    pub fn with_measurement_variance(mut self, variance: f64) -> Self {
        self.noise.measurement_variance = variance;
        self
    }

    /// Set the update policy
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the filter
    pub fn build(&self) -> PositionFilter {
        match self.policy {
            UpdatePolicy::Adaptive(adaptive) => {
                PositionFilter::Adaptive(AdaptiveNoiseFilter::new(self.noise, adaptive))
            }
            UpdatePolicy::Gated(gate) => PositionFilter::Gated(GatedFilter::new(self.noise, gate)),
        }
    }
}

/// Filter chosen at configuration time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionFilter {
    /// Innovation-adaptive policy
    Adaptive(AdaptiveNoiseFilter),
    /// Gated policy
    Gated(GatedFilter),
}

impl Default for PositionFilter {
    fn default() -> Self {
        FilterConfig::default().build()
    }
}

impl StateFilter for PositionFilter {
    fn advance(&self, state: &FilterState, measurement: Option<Point2>, dt_s: f64) -> FilterStep {
        match self {
            Self::Adaptive(filter) => filter.advance(state, measurement, dt_s),
            Self::Gated(filter) => filter.advance(state, measurement, dt_s),
        }
    }

    fn seed(&self, position: Point2) -> FilterState {
        match self {
            Self::Adaptive(filter) => filter.seed(position),
            Self::Gated(filter) => filter.seed(position),
        }
    }
}

/// Shared predict/update cycle; `decide` supplies the policy
pub(crate) fn step_with<D>(
    noise: &NoiseConfig,
    state: &FilterState,
    measurement: Option<Point2>,
    dt_s: f64,
    decide: D,
) -> FilterStep
where
    D: FnOnce(&Innovation, &FilterState) -> TrackResult<Decision>,
{
    let measurement = measurement.filter(Point2::is_finite);

    if !state.initialized {
        return match measurement {
            Some(z) => FilterStep {
                state: FilterState::seeded(z, noise.initial_variance),
                source: FrameSource::Measured,
                outcome: UpdateOutcome::Seeded,
            },
            None => FilterStep {
                state: *state,
                source: FrameSource::Predicted,
                outcome: UpdateOutcome::NoMeasurement,
            },
        };
    }

    let model = noise.model();
    let (x, p) = if dt_s > 0.0 {
        model.predict(&state.vector(), &state.covariance, dt_s)
    } else {
        (state.vector(), state.covariance)
    };
    let predicted = state.with_vector(x, p);

    let Some(z) = measurement else {
        return checked(noise, predicted, None, FrameSource::Predicted, UpdateOutcome::NoMeasurement);
    };

    let nominal = model.measurement_noise(1.0);
    let innovation = model.innovation(&x, &p, &[z.x, z.y], &nominal);

    let (factor, outcome) = match decide(&innovation, state) {
        Ok(Decision::Accept) => (1.0, UpdateOutcome::Accepted),
        Ok(Decision::Inflate(factor)) => {
            log_debug!("outlier fix downweighted, R×{:.2}", factor);
            (factor, UpdateOutcome::Downweighted { factor })
        }
        Ok(Decision::Reject { mahalanobis_sq }) => {
            log_warn!("outlier fix rejected, d²={:.2}", mahalanobis_sq);
            let mut rejected = predicted;
            rejected.consecutive_rejections = state.consecutive_rejections.saturating_add(1);
            return checked(
                noise,
                rejected,
                None,
                FrameSource::Predicted,
                UpdateOutcome::Rejected { mahalanobis_sq },
            );
        }
        Ok(Decision::Reseed) => {
            log_warn!(
                "{} consecutive fixes rejected, re-seeding",
                state.consecutive_rejections
            );
            return reseed(noise, z);
        }
        Err(_err) => {
            log_warn!("innovation unusable ({}), re-seeding", _err);
            return reseed(noise, z);
        }
    };

    let inflated = model.measurement_noise(factor);
    let innovation = if factor == 1.0 {
        innovation
    } else {
        model.innovation(&x, &p, &[z.x, z.y], &inflated)
    };

    match model.correct(&x, &p, &innovation, &inflated) {
        Ok((x, p)) => {
            let mut updated = predicted.with_vector(x, p);
            updated.consecutive_rejections = 0;
            checked(noise, updated, Some(z), FrameSource::Measured, outcome)
        }
        Err(_err) => {
            log_warn!("update failed ({}), re-seeding", _err);
            reseed(noise, z)
        }
    }
}

fn reseed(noise: &NoiseConfig, z: Point2) -> FilterStep {
    FilterStep {
        state: FilterState::seeded(z, noise.initial_variance),
        source: FrameSource::Measured,
        outcome: UpdateOutcome::Seeded,
    }
}

/// Covariance sanity check after every step
fn checked(
    noise: &NoiseConfig,
    state: FilterState,
    fix: Option<Point2>,
    source: FrameSource,
    outcome: UpdateOutcome,
) -> FilterStep {
    let healthy = state.position.is_finite()
        && state.velocity.is_finite()
        && is_positive_semidefinite(&state.covariance, PSD_TOLERANCE);
    if healthy {
        return FilterStep { state, source, outcome };
    }

    log_warn!("covariance lost positive semi-definiteness, re-seeding");
    match fix {
        Some(z) => reseed(noise, z),
        None if state.position.is_finite() => {
            let mut recovered = FilterState::seeded(state.position, noise.initial_variance);
            recovered.consecutive_rejections = state.consecutive_rejections;
            FilterStep {
                state: recovered,
                source,
                outcome,
            }
        }
        None => FilterStep {
            state: FilterState::new(),
            source: FrameSource::Predicted,
            outcome: UpdateOutcome::NoMeasurement,
        },
    }
}
