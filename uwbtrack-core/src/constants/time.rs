//! Time-Related Constants
//!
//! Windowing, resampling and staleness intervals. All timestamps in the
//! pipeline are milliseconds.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: f64 = 1000.0;

// ===== RANGING =====

/// Length of the window that groups anchor ranges into one fix (ms).
///
/// One ranging cycle over four anchors completes well within 50 ms.
pub const RANGE_WINDOW_MS: u64 = 50;

// ===== RESAMPLING =====

/// Acceptance window around a resampling target (ms).
///
/// Gaps wider than this are too large for holding the nearest sample and
/// are handed to the trajectory predictor.
pub const GAP_THRESHOLD_MS: f64 = 100.0;

/// Fine resampling step for dense data (ms), 60 Hz.
pub const FINE_STEP_MS: f64 = 16.67;

/// Coarse resampling step for sparse data (ms), 30 Hz.
pub const COARSE_STEP_MS: f64 = 33.33;

/// Average native interval above which data counts as sparse (ms).
pub const SPARSE_INTERVAL_MS: f64 = 500.0;

/// Reference animation step used to scale the extrapolation cap (ms).
pub const REFERENCE_STEP_MS: f64 = 20.0;

/// Number of samples observed before a streaming resampler fixes its step.
pub const STEP_WARMUP_SAMPLES: usize = 8;

// ===== TRACKING =====

/// Longest time a track may coast on predictions before it is LOST (ms).
pub const DEFAULT_MAX_COAST_MS: u64 = 1000;

/// Minimum interval between predictor retrains (ms).
pub const RETRAIN_INTERVAL_MS: f64 = 500.0;
