//! Error Types for the Localization Pipeline
//!
//! ## Design Philosophy
//!
//! Every failure inside the pipeline is local and recoverable. Errors are
//! therefore small values that a stage converts into a labelled fallback,
//! never panics or aborts:
//!
//! 1. **Small Size**: Variants carry scalars and `&'static str` reasons only,
//!    so errors can be returned from hot paths and stored in step reports.
//!
//! 2. **No Heap Allocation**: Works unchanged on `no_std` targets.
//!
//! 3. **Copy Semantics**: Errors are `Copy` and can be logged and returned
//!    without ownership juggling.
//!
//! ## Error Categories
//!
//! ### Geometry
//! - `InsufficientAnchors`: fewer than 3 valid ranges → position Unknown
//! - `SolverDivergence`: no convergence, collinear anchors or residual too
//!   large → position Unknown
//!
//! ### Estimation
//! - `OutlierMeasurement`: innovation tripped a policy threshold; the filter
//!   reports it in its step outcome and keeps running
//! - `PredictionUnavailable`: predictor lacks history → capped extrapolation
//!
//! ### Input
//! - `MalformedInput`: corrupt ranging record → discarded with a warning
//!
//! ### Numerics and hand-off
//! - `SingularMatrix`, `NumericalInstability`: filter re-seeds
//! - `QueueFull`, `QueueClosed`: ingest hand-off refused a record
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use uwbtrack_core::{TrackError, PositionEstimate};
//!
//! fn label(result: Result<(f64, f64), TrackError>, timestamp: u64) -> PositionEstimate {
//!     match result {
//!         Ok((x, y)) => PositionEstimate::known(timestamp, uwbtrack_core::Point2::new(x, y), 3),
//!         Err(TrackError::InsufficientAnchors { available, .. }) => {
//!             PositionEstimate::unknown(timestamp, available)
//!         }
//!         Err(_) => PositionEstimate::unknown(timestamp, 0),
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for pipeline operations
pub type TrackResult<T> = Result<T, TrackError>;

/// Pipeline errors - all of them locally recoverable
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TrackError {
    /// Not enough valid anchor ranges in a window to attempt a fix
    #[error("Insufficient anchors: need {required}, have {available}")]
    InsufficientAnchors {
        /// Minimum number of valid ranges needed
        required: usize,
        /// Valid ranges actually available
        available: usize,
    },

    /// Optimizer failed or produced an implausible fix
    #[error("Solver diverged: {reason}")]
    SolverDivergence {
        /// Why the fix was rejected
        reason: &'static str,
    },

    /// Measurement innovation exceeded the configured policy threshold
    #[error("Outlier measurement: distance {distance} exceeds {threshold}")]
    OutlierMeasurement {
        /// Innovation magnitude (m) or squared Mahalanobis distance
        distance: f64,
        /// Threshold that was exceeded
        threshold: f64,
    },

    /// Predictor cannot produce a model-based position
    #[error("Prediction unavailable: {reason}")]
    PredictionUnavailable {
        /// What the predictor was missing
        reason: &'static str,
    },

    /// Ranging record could not be parsed or is physically meaningless
    #[error("Malformed input: {reason}")]
    MalformedInput {
        /// Which part of the record was bad
        reason: &'static str,
    },

    /// Matrix could not be inverted or factored
    #[error("Singular matrix")]
    SingularMatrix,

    /// Covariance lost symmetry or positive semi-definiteness
    #[error("Numerical instability detected")]
    NumericalInstability,

    /// Ingest queue is at capacity and its strategy refuses new records
    #[error("Ingest queue full")]
    QueueFull,

    /// Ingest queue no longer accepts records
    #[error("Ingest queue closed")]
    QueueClosed,
}

impl TrackError {
    /// Whether the error means "no position for this instant"
    pub fn is_unknown_position(&self) -> bool {
        matches!(
            self,
            Self::InsufficientAnchors { .. } | Self::SolverDivergence { .. }
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TrackError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InsufficientAnchors { required, available } =>
                defmt::write!(fmt, "Need {} anchors, have {}", required, available),
            Self::SolverDivergence { reason } =>
                defmt::write!(fmt, "Solver diverged: {}", reason),
            Self::OutlierMeasurement { distance, threshold } =>
                defmt::write!(fmt, "Outlier {} > {}", distance, threshold),
            Self::PredictionUnavailable { reason } =>
                defmt::write!(fmt, "Prediction unavailable: {}", reason),
            Self::MalformedInput { reason } =>
                defmt::write!(fmt, "Malformed input: {}", reason),
            Self::SingularMatrix =>
                defmt::write!(fmt, "Singular matrix"),
            Self::NumericalInstability =>
                defmt::write!(fmt, "Numerical instability"),
            Self::QueueFull =>
                defmt::write!(fmt, "Queue full"),
            Self::QueueClosed =>
                defmt::write!(fmt, "Queue closed"),
        }
    }
}
