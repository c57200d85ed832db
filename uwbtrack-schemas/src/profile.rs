//! Sport-context profiles
//!
//! A profile fixes the tracked area and the motion limits a deployment
//! runs with. Trajectory validation uses the same limits, so frames
//! checked against a profile fail exactly where the tracker would have
//! clamped them.

use std::fmt;
use std::str::FromStr;

use uwbtrack_core::{
    constants::{
        physics::{DEFAULT_MAX_ACCEL_MPS2, DEFAULT_MAX_SPEED_MPS, FUTSAL_MAX_SPEED_MPS},
        solver::{MAX_VALID_DISTANCE_M, MIN_VALID_DISTANCE_M},
    },
    Bounds, MotionLimits, SessionConfig,
};

use crate::{physics::FieldConstraints, validation::RecordValidator, SchemaError};

/// Futsal test court length along x (m)
pub const FUTSAL_COURT_LENGTH_M: f64 = 6.26;

/// Futsal test court width along y (m)
pub const FUTSAL_COURT_WIDTH_M: f64 = 6.6;

/// Indoor room length along x (m)
pub const INDOOR_ROOM_LENGTH_M: f64 = 3.45;

/// Indoor room width along y (m)
pub const INDOOR_ROOM_WIDTH_M: f64 = 5.40;

/// Walking and jogging speed ceiling indoors (m/s)
pub const INDOOR_MAX_SPEED_MPS: f64 = 2.5;

/// Shortest plausible range indoors (m)
pub const INDOOR_MIN_DISTANCE_M: f64 = 0.15;

/// Longest plausible range indoors (m); the room diagonal is about 6.4 m
pub const INDOOR_MAX_DISTANCE_M: f64 = 8.0;

/// Deployment context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SportProfile {
    /// Futsal on the instrumented test court
    Futsal,
    /// Small room, walking pace
    Indoor,
    /// Full 40 x 20 m field, conservative limits
    #[default]
    Generic,
}

impl SportProfile {
    /// All profiles
    pub const ALL: [SportProfile; 3] = [Self::Futsal, Self::Indoor, Self::Generic];

    /// Lower-case profile name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Futsal => "futsal",
            Self::Indoor => "indoor",
            Self::Generic => "generic",
        }
    }

    /// Tracked area
    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Futsal => Bounds::from_size(FUTSAL_COURT_LENGTH_M, FUTSAL_COURT_WIDTH_M),
            Self::Indoor => Bounds::from_size(INDOOR_ROOM_LENGTH_M, INDOOR_ROOM_WIDTH_M),
            Self::Generic => Bounds::default(),
        }
    }

    /// Speed and acceleration ceilings with the profile's area
    pub fn limits(&self) -> MotionLimits {
        let max_speed = match self {
            Self::Futsal => FUTSAL_MAX_SPEED_MPS,
            Self::Indoor => INDOOR_MAX_SPEED_MPS,
            Self::Generic => DEFAULT_MAX_SPEED_MPS,
        };
        MotionLimits::default()
            .with_bounds(self.bounds())
            .with_max_speed(max_speed)
            .with_max_accel(DEFAULT_MAX_ACCEL_MPS2)
    }

    /// Plausible range interval `(min, max)` in metres
    pub fn distance_range_m(&self) -> (f64, f64) {
        match self {
            Self::Indoor => (INDOOR_MIN_DISTANCE_M, INDOOR_MAX_DISTANCE_M),
            Self::Futsal | Self::Generic => (MIN_VALID_DISTANCE_M, MAX_VALID_DISTANCE_M),
        }
    }

    /// Session configuration using the profile's limits
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default().with_limits(self.limits())
    }

    /// Ranging validator with the profile's distance interval
    pub fn ranging_validator(&self) -> Result<RecordValidator, SchemaError> {
        let (min, max) = self.distance_range_m();
        Ok(RecordValidator::ranging()?.with_constraints("raw_distance_m", FieldConstraints::unit("m").with_range(min, max)))
    }

    /// Trajectory validator with the profile's area and speed limit
    pub fn trajectory_validator(&self) -> Result<RecordValidator, SchemaError> {
        let limits = self.limits();
        let bounds = limits.bounds;
        let axis = |min, max| {
            FieldConstraints::unit("m")
                .with_range(min, max)
                .with_max_speed(limits.max_speed_mps)
        };
        Ok(RecordValidator::trajectory()?
            .with_constraints("x", axis(bounds.min_x, bounds.max_x))
            .with_constraints("y", axis(bounds.min_y, bounds.max_y)))
    }
}

impl fmt::Display for SportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SportProfile {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::NotFound(format!("sport profile {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert::AvroRecord, validation::IssueType};
    use uwbtrack_core::{FrameSource, Point2, RangeMeasurement, TrackState, TrajectoryFrame};

    #[test]
    fn futsal_limits() {
        let limits = SportProfile::Futsal.limits();
        assert_eq!(limits.max_speed_mps, 7.0);
        assert_eq!(limits.max_accel_mps2, 4.0);
        assert_eq!(limits.bounds.max_x, 6.26);
        assert_eq!(limits.bounds.max_y, 6.6);
    }

    #[test]
    fn generic_matches_core_defaults() {
        assert_eq!(SportProfile::default().limits(), MotionLimits::default());
        assert_eq!(SportProfile::Generic.session_config().resample.limits, MotionLimits::default());
    }

    #[test]
    fn session_config_uses_profile_area() {
        let config = SportProfile::Indoor.session_config();
        assert_eq!(config.resample.limits.max_speed_mps, INDOOR_MAX_SPEED_MPS);
        assert_eq!(config.solver.bounds, SportProfile::Indoor.bounds());
    }

    #[test]
    fn parses_names() {
        for profile in SportProfile::ALL {
            assert_eq!(profile.to_string().parse::<SportProfile>().unwrap(), profile);
        }
        assert_eq!(" FUTSAL ".parse::<SportProfile>().unwrap(), SportProfile::Futsal);
        assert!("rugby".parse::<SportProfile>().is_err());
    }

    #[test]
    fn indoor_rejects_long_ranges() {
        let range = RangeMeasurement::new(1, 0, 10, 12.0).to_avro_value();
        assert!(SportProfile::Futsal.ranging_validator().unwrap().validate(&range).is_valid());
        assert!(SportProfile::Indoor
            .ranging_validator()
            .unwrap()
            .validate(&range)
            .has_error(IssueType::PhysicsViolation));
    }

    #[test]
    fn trajectory_outside_area() {
        let frame = |ts: f64, x: f64| {
            TrajectoryFrame::new(ts, Point2::new(x, 1.0), FrameSource::Measured, TrackState::Tracking).to_avro_value()
        };
        let validator = SportProfile::Indoor.trajectory_validator().unwrap();
        assert!(validator.validate(&frame(0.0, 3.0)).is_valid());
        assert!(validator.validate(&frame(0.0, 4.0)).has_error(IssueType::PhysicsViolation));

        // 3 m/s is fine on the court but too fast indoors
        let walk = [frame(0.0, 1.0), frame(100.0, 1.3)];
        assert!(SportProfile::Futsal.trajectory_validator().unwrap().validate_sequence(&walk).is_valid());
        assert!(validator.validate_sequence(&walk).has_error(IssueType::RateViolation));
    }
}
