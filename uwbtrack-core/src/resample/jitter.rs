//! Jitter correction
//!
//! A frame is jitter when it sits at the tip of a sharp out-and-back spike:
//!
//! ```text
//!            p[i]
//!            ╱╲          d1 = p[i] − p[i−1]
//!           ╱  ╲         d2 = p[i+1] − p[i]
//!          ╱    ╲
//!   p[i−1]        p[i+1]
//!
//! jitter ⇔ |d1| > min_step ∧ |d2| > min_step ∧ d1·d2 < cos_thr·|d1|·|d2|
//! ```
//!
//! Jitter frames are replaced by the midpoint of their neighbours and marked
//! Interpolated. Detection always looks at the uncorrected neighbours, so
//! one correction never cascades into the next frame's decision.

use alloc::vec::Vec;

use crate::{
    constants::resample::{JITTER_MIN_STEP_M, JITTER_REVERSAL_COSINE},
    frame::{FrameSource, TrajectoryFrame},
    geometry::Point2,
};

/// Jitter detection thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JitterConfig {
    /// Both moves must exceed this length (m)
    pub min_step_m: f64,
    /// Cosine of the angle between the moves must be below this
    pub reversal_cosine: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            min_step_m: JITTER_MIN_STEP_M,
            reversal_cosine: JITTER_REVERSAL_COSINE,
        }
    }
}

impl JitterConfig {
    /// Set the minimum move length
    pub fn with_min_step(mut self, min_step_m: f64) -> Self {
        self.min_step_m = min_step_m;
        self
    }

    /// Set the reversal cosine threshold
    pub fn with_reversal_cosine(mut self, reversal_cosine: f64) -> Self {
        self.reversal_cosine = reversal_cosine;
        self
    }

    /// Whether `current` is a spike between `previous` and `next`
    pub fn is_jitter(&self, previous: Point2, current: Point2, next: Point2) -> bool {
        let d1 = current - previous;
        let d2 = next - current;
        let m1 = d1.norm();
        let m2 = d2.norm();
        m1 > self.min_step_m && m2 > self.min_step_m && d1.dot(&d2) < self.reversal_cosine * m1 * m2
    }

    /// Corrected copy of `current`
    pub fn correct(
        &self,
        previous: &TrajectoryFrame,
        current: &TrajectoryFrame,
        next: &TrajectoryFrame,
    ) -> TrajectoryFrame {
        if !self.is_jitter(previous.position, current.position, next.position) {
            return *current;
        }
        TrajectoryFrame {
            position: previous.position.midpoint(&next.position),
            source: FrameSource::Interpolated,
            ..*current
        }
    }
}

/// Correct every interior frame against its original neighbours
pub fn correct_jitter(config: &JitterConfig, frames: &[TrajectoryFrame]) -> Vec<TrajectoryFrame> {
    let mut corrected = frames.to_vec();
    for (i, window) in frames.windows(3).enumerate() {
        corrected[i + 1] = config.correct(&window[0], &window[1], &window[2]);
    }
    corrected
}
