//! Temporal Resampler & Smoother
//!
//! ## Overview
//!
//! Turns one tag's irregular filter output into an evenly spaced, smoothed
//! trajectory suitable for rendering and reporting:
//!
//! ```text
//! FilteredSample ──→ Resampler ──→ raw frames ──→ StreamingSmoother ──→ TrajectoryFrame
//!  (native ts)      (fixed step,     (held,        (jitter, moving      (cumulative
//!                    gap filling)     predicted)     average)             distance)
//! ```
//!
//! ## Modules
//!
//! - [`timeline`]: step selection and target resolution
//! - [`gap`]: the [`GapFiller`] seam for model-based prediction
//! - [`jitter`]: spike detection and correction
//! - [`smoothing`]: moving average, streaming smoother, distance
//! - [`trajectory`]: the finished [`Trajectory`]
//!
//! ## Guarantees
//!
//! - Output timestamps are strictly increasing with a constant step.
//! - Every frame states its source; gaps are never silently papered over.
//! - Synthesized positions obey the configured [`MotionLimits`].

pub mod gap;
pub mod jitter;
pub mod smoothing;
pub mod timeline;
pub mod trajectory;

pub use gap::{GapFiller, NoModel};
pub use jitter::{correct_jitter, JitterConfig};
pub use smoothing::{accumulate_distance, moving_average, smooth_frames, SmoothingConfig, StreamingSmoother};
pub use timeline::{mean_interval, select_step, ResampleStats, Resampler, StepPolicy};
pub use trajectory::Trajectory;

use crate::{
    constants::time::GAP_THRESHOLD_MS,
    frame::FilteredSample,
    limits::MotionLimits,
    tracking::TrackingConfig,
};

/// Resampler configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResampleConfig {
    /// Timeline step policy
    pub step: StepPolicy,
    /// Largest offset at which a sample may be held for a target (ms)
    pub gap_threshold_ms: f64,
    /// Limits applied to synthesized positions
    pub limits: MotionLimits,
    /// Coasting and LOST behaviour
    pub tracking: TrackingConfig,
    /// Jitter correction and moving average
    pub smoothing: SmoothingConfig,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            step: StepPolicy::Adaptive,
            gap_threshold_ms: GAP_THRESHOLD_MS,
            limits: MotionLimits::default(),
            tracking: TrackingConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl ResampleConfig {
    /// Set the step policy
    pub fn with_step(mut self, step: StepPolicy) -> Self {
        self.step = step;
        self
    }

    /// Set the hold window
    pub fn with_gap_threshold(mut self, gap_threshold_ms: f64) -> Self {
        self.gap_threshold_ms = gap_threshold_ms.max(0.0);
        self
    }

    /// Set the motion limits
    pub fn with_limits(mut self, limits: MotionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the tracking behaviour
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    /// Set the smoothing stage
    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }
}

/// Resample a complete recording in one call
///
/// With an adaptive step the step is chosen from the mean interval of the
/// whole recording rather than its first samples.
pub fn resample_all<F: GapFiller>(
    samples: &[FilteredSample],
    config: ResampleConfig,
    filler: F,
) -> Trajectory {
    let config = match config.step {
        StepPolicy::Adaptive => {
            let mean = mean_interval(samples.iter().map(|s| s.timestamp_ms as f64));
            config.with_step(StepPolicy::Fixed(select_step(mean.unwrap_or(0.0))))
        }
        StepPolicy::Fixed(_) => config,
    };

    let mut resampler = Resampler::new(config, filler);
    let mut trajectory = Trajectory::new();
    for sample in samples {
        resampler.push(*sample);
        trajectory.extend(resampler.take_ready());
    }
    resampler.flush();
    trajectory.extend(resampler.take_ready());
    trajectory
}
