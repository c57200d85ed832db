//! Physical plausibility limits
//!
//! Every synthesized position (prediction or extrapolation) passes through
//! [`MotionLimits::constrain`] before it is emitted:
//!
//! ```text
//! candidate ──→ clamp to area
//!           ──→ implied velocity v = (c − p)/Δt
//!           ──→ |v − v_prev| ≤ a_max·Δt
//!           ──→ |v| ≤ v_max
//!           ──→ p + v·Δt, clamped to area again
//! ```

use crate::{
    constants::{
        physics::{DEFAULT_MAX_ACCEL_MPS2, DEFAULT_MAX_SPEED_MPS},
        resample::EXTRAPOLATION_CAP_M,
        time::{MS_PER_SECOND, REFERENCE_STEP_MS},
    },
    geometry::{Bounds, Point2},
};

/// Position with the velocity that led to it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematic {
    /// Position (m)
    pub position: Point2,
    /// Velocity (m/s)
    pub velocity: Point2,
}

impl Kinematic {
    /// Create a kinematic point
    pub fn new(position: Point2, velocity: Point2) -> Self {
        Self { position, velocity }
    }

    /// Stationary point
    pub fn at_rest(position: Point2) -> Self {
        Self::new(position, Point2::ZERO)
    }
}

/// Area, speed and acceleration limits
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionLimits {
    /// Tracked area
    pub bounds: Bounds,
    /// Speed ceiling (m/s)
    pub max_speed_mps: f64,
    /// Acceleration ceiling (m/s²)
    pub max_accel_mps2: f64,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            max_speed_mps: DEFAULT_MAX_SPEED_MPS,
            max_accel_mps2: DEFAULT_MAX_ACCEL_MPS2,
        }
    }
}

impl MotionLimits {
    /// Set the tracked area
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the speed ceiling
    pub fn with_max_speed(mut self, max_speed_mps: f64) -> Self {
        self.max_speed_mps = max_speed_mps.max(0.0);
        self
    }

    /// Set the acceleration ceiling
    pub fn with_max_accel(mut self, max_accel_mps2: f64) -> Self {
        self.max_accel_mps2 = max_accel_mps2.max(0.0);
        self
    }

    /// Bring `candidate` within reach of `previous` after `dt_s` seconds
    pub fn constrain(&self, previous: Option<Kinematic>, candidate: Point2, dt_s: f64) -> Kinematic {
        let candidate = self.bounds.clamp(candidate);
        let Some(previous) = previous else {
            return Kinematic::at_rest(candidate);
        };
        if !(dt_s > 0.0) {
            return Kinematic::new(candidate, previous.velocity);
        }

        let origin = self.bounds.clamp(previous.position);
        let wanted = (candidate - origin) * (1.0 / dt_s);
        let change = (wanted - previous.velocity).clamp_norm(self.max_accel_mps2 * dt_s);
        let velocity = (previous.velocity + change).clamp_norm(self.max_speed_mps);

        let position = self.bounds.clamp(origin + velocity * dt_s);
        Kinematic::new(position, (position - origin) * (1.0 / dt_s))
    }

    /// Longest extrapolated move allowed over `step_ms`
    pub fn extrapolation_cap(&self, step_ms: f64) -> f64 {
        let scaled = EXTRAPOLATION_CAP_M * step_ms / REFERENCE_STEP_MS;
        scaled.min(self.max_speed_mps * step_ms / MS_PER_SECOND)
    }
}

/// Continue the move `previous → last` for one more step, capped at `cap_m`
pub fn capped_extrapolation(previous: Point2, last: Point2, cap_m: f64) -> Point2 {
    last + (last - previous).clamp_norm(cap_m)
}
