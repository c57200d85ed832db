//! Per-tag processing session
//!
//! A `TagSession` owns everything that carries state from one timestamp to
//! the next for a single tag, and runs the stages strictly in order:
//!
//! ```text
//! RangeMeasurement ─→ RangeWindower ─→ Multilaterator ─→ StateFilter ─→ Track ─→ Resampler
//!                      (50 ms batch)    (Unknown ok)      (FilterState)  (state)   (frames)
//! ```
//!
//! Sessions are independent; different tags may run on different threads,
//! but a session itself is never shared.

use crate::{
    anchors::AnchorMap,
    filter::{FilterConfig, FilterState, FilterStep, PositionFilter, StateFilter, UpdateOutcome},
    frame::{FrameSource, PositionEstimate, TrajectoryFrame},
    geometry::{Bounds, Point2},
    limits::MotionLimits,
    macros::{log_debug, log_warn},
    measurement::{RangeMeasurement, TagId},
    resample::{GapFiller, ResampleConfig, Resampler, Trajectory},
    solver::{Multilaterator, RangeBatch, RangeWindower, SolverConfig, WindowConfig},
    time::{elapsed_secs, Timestamp},
    tracking::{Track, TrackState, TrackingConfig},
};

/// Configuration of every stage of a session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Range windowing
    pub window: WindowConfig,
    /// Multilateration
    pub solver: SolverConfig,
    /// State filter
    pub filter: FilterConfig,
    /// Coasting and LOST behaviour, shared by filter side and resampler
    pub tracking: TrackingConfig,
    /// Resampling and smoothing
    pub resample: ResampleConfig,
}

impl SessionConfig {
    /// Set the tracked area for both the solver and the motion limits
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.solver = self.solver.with_bounds(bounds);
        self.resample.limits.bounds = bounds;
        self
    }

    /// Set the motion limits (their bounds become the solver's too)
    pub fn with_limits(mut self, limits: MotionLimits) -> Self {
        self.solver = self.solver.with_bounds(limits.bounds);
        self.resample.limits = limits;
        self
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Set the tracking behaviour
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    /// Set the resampler
    pub fn with_resample(mut self, resample: ResampleConfig) -> Self {
        self.resample = resample;
        self
    }

    /// Set the windowing
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }
}

/// Per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Ranging windows processed
    pub windows: u64,
    /// Windows that produced a position
    pub fixes: u64,
    /// Windows with an Unknown position
    pub unknown: u64,
    /// Fixes down-weighted by the filter
    pub downweighted: u64,
    /// Fixes rejected by the filter
    pub rejected: u64,
    /// Filter (re)initializations
    pub seeds: u64,
    /// Records for another tag handed to this session
    pub misrouted: u64,
}

/// Processing session for one tag
pub struct TagSession<F: GapFiller> {
    tag_id: TagId,
    windower: RangeWindower,
    solver: Multilaterator,
    filter: PositionFilter,
    state: FilterState,
    track: Track,
    warm_start: Option<Point2>,
    last_step_ms: Option<Timestamp>,
    resampler: Resampler<F>,
    trajectory: Trajectory,
    polled: usize,
    stats: SessionStats,
}

impl<F: GapFiller> TagSession<F> {
    /// Start a session; `filler` predicts positions for timeline gaps
    pub fn new(tag_id: TagId, config: SessionConfig, filler: F) -> Self {
        let resample = config.resample.with_tracking(config.tracking);
        Self {
            tag_id,
            windower: RangeWindower::new(config.window),
            solver: Multilaterator::new(config.solver),
            filter: config.filter.build(),
            state: FilterState::new(),
            track: Track::new(config.tracking),
            warm_start: None,
            last_step_ms: None,
            resampler: Resampler::new(resample, filler),
            trajectory: Trajectory::new(),
            polled: 0,
            stats: SessionStats::default(),
        }
    }

    /// Tag this session tracks
    pub fn tag_id(&self) -> TagId {
        self.tag_id
    }

    /// Current tracking state
    pub fn track_state(&self) -> TrackState {
        self.track.state()
    }

    /// Current filter state
    pub fn filter_state(&self) -> &FilterState {
        &self.state
    }

    /// Counters
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Resampler, e.g. to inspect its counters or gap filler
    pub fn resampler(&self) -> &Resampler<F> {
        &self.resampler
    }

    /// Frames produced so far
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Feed one ranging record; returns the filter step when a window closes
    pub fn push(&mut self, measurement: RangeMeasurement, anchors: &AnchorMap) -> Option<FilterStep> {
        if measurement.tag_id != self.tag_id {
            log_warn!(
                "session for tag {} got a record for tag {}",
                self.tag_id,
                measurement.tag_id
            );
            self.stats.misrouted += 1;
            return None;
        }
        let batch = self.windower.push(measurement)?;
        Some(self.ingest(&batch, anchors))
    }

    /// Solve and filter one complete ranging window
    pub fn ingest(&mut self, batch: &RangeBatch, anchors: &AnchorMap) -> FilterStep {
        let estimate = self.solver.estimate(batch, anchors, self.warm_start);
        self.step(estimate)
    }

    /// Filter one position estimate, possibly Unknown
    pub fn step(&mut self, estimate: PositionEstimate) -> FilterStep {
        let timestamp = estimate.timestamp_ms;
        self.stats.windows += 1;

        let fix = if estimate.is_unknown() {
            self.stats.unknown += 1;
            None
        } else {
            self.stats.fixes += 1;
            estimate.position
        };

        if fix.is_some() && self.state.initialized && self.is_stale(timestamp) {
            log_debug!("tag {}: re-acquired, re-seeding filter", self.tag_id);
            self.state = FilterState::new();
        }

        let dt_s = self
            .last_step_ms
            .map_or(0.0, |last| elapsed_secs(last, timestamp));
        let step = self.filter.advance(&self.state, fix, dt_s);
        self.state = step.state;
        self.last_step_ms = Some(timestamp);

        match step.outcome {
            UpdateOutcome::Downweighted { .. } => self.stats.downweighted += 1,
            UpdateOutcome::Rejected { .. } => self.stats.rejected += 1,
            UpdateOutcome::Seeded => self.stats.seeds += 1,
            _ => {}
        }

        let has_fix = step.source == FrameSource::Measured;
        if has_fix {
            self.warm_start = fix;
        }
        let track_state = self.track.observe(timestamp, has_fix);

        if let Some(sample) = step.sample(timestamp, track_state) {
            self.resampler.push(sample);
        }
        self.trajectory.extend(self.resampler.take_ready());
        step
    }

    /// Whether the last fix is too old to coast from at `timestamp`
    fn is_stale(&self, timestamp: Timestamp) -> bool {
        let age = self
            .track
            .last_fix_ms()
            .map(|last| timestamp.saturating_sub(last) as f64);
        self.track.state() == TrackState::Lost || self.track.config().classify(age) == TrackState::Lost
    }

    /// Frames produced since the previous poll
    pub fn poll_frames(&mut self) -> &[TrajectoryFrame] {
        let start = self.polled;
        self.polled = self.trajectory.len();
        &self.trajectory.frames()[start..]
    }

    /// Close the open window, flush every stage and return the trajectory
    pub fn finish(mut self, anchors: &AnchorMap) -> Trajectory {
        if let Some(batch) = self.windower.flush() {
            self.ingest(&batch, anchors);
        }
        self.resampler.flush();
        self.trajectory.extend(self.resampler.take_ready());
        log_debug!(
            "tag {}: session finished with {} frames",
            self.tag_id,
            self.trajectory.len()
        );
        self.trajectory
    }

    /// Process a whole recording of this tag's records
    pub fn replay<I>(mut self, records: I, anchors: &AnchorMap) -> Trajectory
    where
        I: IntoIterator<Item = RangeMeasurement>,
    {
        for record in records {
            self.push(record, anchors);
        }
        self.finish(anchors)
    }
}

impl<F: GapFiller> core::fmt::Debug for TagSession<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TagSession")
            .field("tag_id", &self.tag_id)
            .field("track_state", &self.track.state())
            .field("frames", &self.trajectory.len())
            .field("stats", &self.stats)
            .finish()
    }
}
