//! Resampled trajectory with distance queries

use alloc::vec::Vec;

use crate::{constants::time::MS_PER_SECOND, frame::TrajectoryFrame};

/// Ordered frames of one tag's resampled, smoothed track
///
/// Frames carry a running `cumulative_distance`, so distance and average
/// speed between any two frames are constant-time lookups.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    frames: Vec<TrajectoryFrame>,
}

impl Trajectory {
    /// Empty trajectory
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap frames that already carry cumulative distances
    pub fn from_frames(frames: Vec<TrajectoryFrame>) -> Self {
        Self { frames }
    }

    /// Append frames
    pub fn extend<I: IntoIterator<Item = TrajectoryFrame>>(&mut self, frames: I) {
        self.frames.extend(frames);
    }

    /// All frames
    pub fn frames(&self) -> &[TrajectoryFrame] {
        &self.frames
    }

    /// Consume into the frame list
    pub fn into_frames(self) -> Vec<TrajectoryFrame> {
        self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Distance covered by the whole trajectory (m)
    pub fn total_distance(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.cumulative_distance - first.cumulative_distance,
            _ => 0.0,
        }
    }

    /// Distance covered between frames `i` and `j` (m)
    pub fn distance_between(&self, i: usize, j: usize) -> Option<f64> {
        let a = self.frames.get(i)?;
        let b = self.frames.get(j)?;
        Some(libm::fabs(b.cumulative_distance - a.cumulative_distance))
    }

    /// Average speed between frames `i` and `j` (m/s)
    ///
    /// `None` for out-of-range indices or frames at the same instant.
    pub fn speed_between(&self, i: usize, j: usize) -> Option<f64> {
        let distance = self.distance_between(i, j)?;
        let elapsed_ms = libm::fabs(self.frames[j].timestamp_ms - self.frames[i].timestamp_ms);
        if !(elapsed_ms > 0.0) {
            return None;
        }
        Some(distance / (elapsed_ms / MS_PER_SECOND))
    }
}

impl FromIterator<TrajectoryFrame> for Trajectory {
    fn from_iter<I: IntoIterator<Item = TrajectoryFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Trajectory {
    type Item = TrajectoryFrame;
    type IntoIter = alloc::vec::IntoIter<TrajectoryFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
