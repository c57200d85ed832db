//! Pipeline data records
//!
//! - `PositionEstimate`: solver output for one ranging window, possibly
//!   Unknown.
//! - `FilteredSample`: filter output at a native (irregular) timestamp.
//! - `TrajectoryFrame`: resampled, smoothed output on the fixed timeline.
//!
//! Frames are immutable once emitted. Every frame states where its position
//! came from, so no measurement gap is ever hidden from consumers.

use crate::{
    geometry::Point2,
    time::Timestamp,
    tracking::TrackState,
};

/// Solver output for one ranging window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionEstimate {
    /// Window timestamp (ms)
    pub timestamp_ms: Timestamp,
    /// Solved position, `None` when Unknown
    pub position: Option<Point2>,
    /// Valid anchor ranges that went into the solve
    pub contributing_anchor_count: usize,
}

impl PositionEstimate {
    /// Estimate with a solved position
    pub fn known(timestamp_ms: Timestamp, position: Point2, contributing_anchor_count: usize) -> Self {
        Self {
            timestamp_ms,
            position: Some(position),
            contributing_anchor_count,
        }
    }

    /// Estimate without a position
    pub fn unknown(timestamp_ms: Timestamp, contributing_anchor_count: usize) -> Self {
        Self {
            timestamp_ms,
            position: None,
            contributing_anchor_count,
        }
    }

    /// Whether the position is Unknown (missing or not finite)
    pub fn is_unknown(&self) -> bool {
        !matches!(self.position, Some(p) if p.is_finite())
    }
}

/// Origin of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameSource {
    /// Filter update with a fresh fix
    Measured,
    /// Filter prediction, model prediction or extrapolation
    Predicted,
    /// Held from a neighbouring sample or corrected from its neighbours
    Interpolated,
}

impl FrameSource {
    /// Upper-case label used in exported records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Measured => "MEASURED",
            Self::Predicted => "PREDICTED",
            Self::Interpolated => "INTERPOLATED",
        }
    }
}

/// Filter output at a native timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    /// Native timestamp (ms)
    pub timestamp_ms: Timestamp,
    /// Filtered position
    pub position: Point2,
    /// Filtered velocity (m/s)
    pub velocity: Point2,
    /// Whether the filter updated or only predicted
    pub source: FrameSource,
    /// Track state when the sample was produced
    pub track_state: TrackState,
}

impl FilteredSample {
    /// Whether the resampler may hold this sample for a nearby target
    ///
    /// Filter updates always qualify; predict-only samples qualify while the
    /// track is still coasting.
    pub fn is_trusted(&self) -> bool {
        match self.source {
            FrameSource::Measured => self.track_state != TrackState::Lost,
            _ => matches!(self.track_state, TrackState::Tracking | TrackState::Coasting),
        }
    }
}

/// Output frame on the fixed-rate timeline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrajectoryFrame {
    /// Timeline timestamp (ms); fractional on 16.67 ms steps
    pub timestamp_ms: f64,
    /// Smoothed position
    pub position: Point2,
    /// Velocity (m/s) when known
    pub velocity: Option<Point2>,
    /// Where the position came from
    pub source: FrameSource,
    /// Track state at this instant
    pub track_state: TrackState,
    /// Distance travelled since the first frame (m)
    pub cumulative_distance: f64,
}

impl TrajectoryFrame {
    /// New frame with zero cumulative distance
    pub fn new(timestamp_ms: f64, position: Point2, source: FrameSource, track_state: TrackState) -> Self {
        Self {
            timestamp_ms,
            position,
            velocity: None,
            source,
            track_state,
            cumulative_distance: 0.0,
        }
    }

    /// Attach a velocity
    pub fn with_velocity(mut self, velocity: Point2) -> Self {
        self.velocity = Some(velocity);
        self
    }
}
