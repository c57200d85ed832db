//! Motion and Playing-Area Constants
//!
//! Limits on how fast a tracked person can plausibly move, and the default
//! dimensions of the tracked area. Values come from futsal field trials and
//! published sprint data for indoor sports.

// ===== MOTION LIMITS =====

/// Default maximum speed of a tracked player (m/s).
///
/// Conservative general-purpose limit. Sport profiles raise it; a futsal
/// sprint tops out around 7 m/s.
///
/// Source: Indoor sports tracking field trials
pub const DEFAULT_MAX_SPEED_MPS: f64 = 5.0;

/// Maximum sprint speed for futsal players (m/s).
///
/// Source: Futsal match analysis, elite players
pub const FUTSAL_MAX_SPEED_MPS: f64 = 7.0;

/// Default maximum acceleration of a tracked player (m/s²).
///
/// Source: Futsal match analysis, change-of-direction drills
pub const DEFAULT_MAX_ACCEL_MPS2: f64 = 4.0;

/// Speed above which a player is considered to be sprinting (m/s).
///
/// While sprinting the predictor may use the full speed limit; otherwise it
/// stays close to the recent average speed.
pub const SPRINT_THRESHOLD_MPS: f64 = 4.0;

/// Average speed assumed when there is no usable history (m/s).
pub const DEFAULT_AVERAGE_SPEED_MPS: f64 = 2.0;

/// Margin applied to the average speed when not sprinting.
pub const AVERAGE_SPEED_MARGIN: f64 = 1.2;

// ===== AREA DIMENSIONS =====

/// Default area length along x (m). Regulation futsal pitch length.
pub const DEFAULT_AREA_LENGTH_M: f64 = 40.0;

/// Default area width along y (m). Regulation futsal pitch width.
pub const DEFAULT_AREA_WIDTH_M: f64 = 20.0;

/// Search margin around the area used by the position solver (m).
///
/// Lets the solver return fixes slightly outside the lines instead of
/// pinning them to the boundary.
pub const SOLVER_AREA_MARGIN_M: f64 = 0.5;

/// Default tag height above the floor (m), worn at chest level.
pub const DEFAULT_TAG_HEIGHT_M: f64 = 1.2;

/// Default anchor mounting height (m).
pub const DEFAULT_ANCHOR_HEIGHT_M: f64 = 1.5;
