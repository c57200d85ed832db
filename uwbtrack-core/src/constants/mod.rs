//! Constants for uwbtrack Core
//!
//! This module centralizes the numeric defaults used throughout the
//! localization pipeline. Every value carries its unit in the name and a
//! short note on where it comes from, so configuration defaults never hide
//! magic numbers.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Physics**: Human motion limits and playing-area dimensions
//! - **Time**: Windowing, resampling and staleness intervals
//! - **Filter**: Kalman noise parameters and outlier thresholds
//! - **Solver**: Multilateration tolerances and validity limits
//! - **Resample**: Extrapolation caps, jitter and smoothing parameters
//!
//! ## Usage Guidelines
//!
//! 1. Config `Default` impls read from here, never from literals
//! 2. Include the unit in every constant name
//! 3. Document the source of the value (field trials, standards, theory)

/// Human motion limits and playing-area dimensions.
pub mod physics;

/// Windowing, resampling and staleness intervals.
pub mod time;

/// Kalman filter noise parameters and outlier-handling thresholds.
pub mod filter;

/// Multilateration tolerances and range validity limits.
pub mod solver;

/// Extrapolation caps, jitter detection and moving-average parameters.
pub mod resample;

pub use physics::{
    DEFAULT_MAX_SPEED_MPS, DEFAULT_MAX_ACCEL_MPS2, SPRINT_THRESHOLD_MPS,
};

pub use time::{
    MS_PER_SECOND, RANGE_WINDOW_MS, GAP_THRESHOLD_MS, DEFAULT_MAX_COAST_MS,
};

pub use filter::{
    DEFAULT_PROCESS_NOISE_DENSITY, DEFAULT_MEASUREMENT_VARIANCE_M2,
    CHI_SQUARE_2DOF_99,
};

pub use solver::{MIN_ANCHORS_FOR_FIX, MIN_VALID_DISTANCE_M};
