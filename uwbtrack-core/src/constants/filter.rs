//! State Filter Constants
//!
//! Noise parameters for the constant-velocity Kalman filter and the
//! thresholds of its two outlier policies. Deployments tune these through
//! `FilterConfig`; the values here are the defaults.

// ===== NOISE MODEL =====

/// Process noise spectral density of the white-noise acceleration model (m²/s³).
///
/// Large enough to follow direction changes of a running player at 50 Hz
/// ranging, small enough that a single bad fix barely moves the track.
pub const DEFAULT_PROCESS_NOISE_DENSITY: f64 = 1.0;

/// Measurement variance of a multilateration fix (m²), per axis.
///
/// Source: UWB two-way ranging accuracy of ~10 cm per anchor, inflated by
/// geometric dilution over four anchors
pub const DEFAULT_MEASUREMENT_VARIANCE_M2: f64 = 0.1;

/// Initial state variance used when a track is seeded (m², m²/s²).
///
/// Large so the first few measurements dominate the prior.
pub const INITIAL_VARIANCE: f64 = 50.0;

// ===== ADAPTIVE POLICY =====

/// Innovation magnitude above which measurement noise is inflated (m).
pub const ADAPTIVE_INNOVATION_THRESHOLD_M: f64 = 1.0;

/// Proportional gain of the noise inflation per unit of excess innovation.
pub const ADAPTIVE_INFLATION_GAIN: f64 = 1.0;

/// Upper bound on the measurement-noise inflation factor.
pub const ADAPTIVE_MAX_INFLATION: f64 = 50.0;

// ===== GATED POLICY =====

/// χ² threshold for 2 degrees of freedom at 99 % confidence.
///
/// Source: χ² distribution table
pub const CHI_SQUARE_2DOF_99: f64 = 9.21;

/// Consecutive gate rejections after which the track is re-seeded.
pub const MAX_CONSECUTIVE_REJECTIONS: u32 = 10;

// ===== NUMERICS =====

/// Tolerance below zero accepted for covariance eigenvalues.
pub const PSD_TOLERANCE: f64 = 1e-9;
