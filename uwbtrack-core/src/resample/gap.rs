//! Gap filling seam
//!
//! The resampler asks a [`GapFiller`] for a position whenever a timeline
//! target has no trustworthy sample nearby. Motion models live outside this
//! crate (`uwbtrack-ml` provides the Gaussian-process predictor); a filler
//! that cannot answer returns `PredictionUnavailable` and the resampler falls
//! back to capped linear extrapolation.

use crate::{
    errors::{TrackError, TrackResult},
    geometry::Point2,
    limits::Kinematic,
};

/// Source of positions for timeline gaps
pub trait GapFiller {
    /// Record a trusted fix at `timestamp_ms`
    fn observe(&mut self, timestamp_ms: f64, position: Point2);

    /// Position at `timestamp_ms`, given the last emitted point
    fn fill(&mut self, timestamp_ms: f64, last: &Kinematic) -> TrackResult<Point2>;

    /// Drop all history, e.g. after the track was lost
    fn reset(&mut self);
}

/// Filler without a motion model
///
/// Always defers to the resampler's linear extrapolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModel;

impl GapFiller for NoModel {
    fn observe(&mut self, _timestamp_ms: f64, _position: Point2) {}

    fn fill(&mut self, _timestamp_ms: f64, _last: &Kinematic) -> TrackResult<Point2> {
        Err(TrackError::PredictionUnavailable {
            reason: "no motion model",
        })
    }

    fn reset(&mut self) {}
}

impl<F: GapFiller + ?Sized> GapFiller for &mut F {
    fn observe(&mut self, timestamp_ms: f64, position: Point2) {
        (**self).observe(timestamp_ms, position)
    }

    fn fill(&mut self, timestamp_ms: f64, last: &Kinematic) -> TrackResult<Point2> {
        (**self).fill(timestamp_ms, last)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<F: GapFiller + ?Sized> GapFiller for alloc::boxed::Box<F> {
    fn observe(&mut self, timestamp_ms: f64, position: Point2) {
        (**self).observe(timestamp_ms, position)
    }

    fn fill(&mut self, timestamp_ms: f64, last: &Kinematic) -> TrackResult<Point2> {
        (**self).fill(timestamp_ms, last)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
