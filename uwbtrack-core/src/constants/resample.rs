//! Resampling and smoothing constants
//!
//! Field values come from replaying recorded futsal sessions at 60 Hz and
//! 30 Hz output rates.

// ============================================================================
// Extrapolation
// ============================================================================

/// Longest jump a linear extrapolation may add per reference step (m)
///
/// Scaled by `step_ms / REFERENCE_STEP_MS`, so a 16.67 ms step allows
/// about 0.42 m.
pub const EXTRAPOLATION_CAP_M: f64 = 0.5;

// ============================================================================
// Jitter Correction
// ============================================================================

/// Smallest frame-to-frame move that can count as jitter (m)
pub const JITTER_MIN_STEP_M: f64 = 1.5;

/// Cosine below which two consecutive moves count as a reversal
///
/// `dot(d1, d2) < JITTER_REVERSAL_COSINE · |d1|·|d2|` means the moves point
/// more than 120° apart.
pub const JITTER_REVERSAL_COSINE: f64 = -0.5;

// ============================================================================
// Moving Average
// ============================================================================

/// Default centred moving-average window (frames, odd)
pub const SMOOTHING_WINDOW: usize = 3;

/// Weight of the partial average on frames near either end
///
/// Edge frames are blended as `w·avg + (1 − w)·original` because their
/// window is one-sided.
pub const EDGE_BLEND_WEIGHT: f64 = 0.9;
