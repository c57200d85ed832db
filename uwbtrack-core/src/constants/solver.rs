//! Multilateration Constants
//!
//! Validity limits for anchor ranges and convergence settings for the
//! bounded least-squares solver.

// ===== RANGE VALIDITY =====

/// Minimum number of valid anchor ranges needed to attempt a 2D fix.
pub const MIN_ANCHORS_FOR_FIX: usize = 3;

/// Shortest distance accepted as a real range (m).
///
/// Anchors report 0.0 when ranging failed.
pub const MIN_VALID_DISTANCE_M: f64 = 0.01;

/// Longest distance accepted as a real range (m).
pub const MAX_VALID_DISTANCE_M: f64 = 200.0;

/// Weakest signal accepted from an anchor (dBm).
pub const MIN_RSSI_DBM: f64 = -90.0;

/// Maximum number of anchors kept per ranging window.
pub const MAX_ANCHORS_PER_WINDOW: usize = 16;

// ===== CONVERGENCE =====

/// Iteration limit of the Levenberg-Marquardt loop.
pub const SOLVER_MAX_ITERATIONS: usize = 100;

/// Step norm below which the solver is considered converged (m).
pub const SOLVER_STEP_TOLERANCE_M: f64 = 1e-7;

/// RMS range residual above which a fix is rejected (m).
pub const SOLVER_MAX_RMS_RESIDUAL_M: f64 = 1.5;

/// Initial Levenberg-Marquardt damping.
pub const SOLVER_INITIAL_DAMPING: f64 = 1e-3;

/// Minimum normalized triangle area for non-collinear anchor geometry.
///
/// Area of the largest anchor triangle divided by the squared anchor
/// spread; about 0.43 for an equilateral layout, 0 for anchors on a line.
pub const MIN_GEOMETRY_SPREAD: f64 = 1e-3;
