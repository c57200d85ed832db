//! Fixed-step timeline
//!
//! ## Step Selection
//!
//! ```text
//! mean native interval ≤ 500 ms  →  16.67 ms  (60 Hz)
//! mean native interval  > 500 ms  →  33.33 ms  (30 Hz)
//! ```
//!
//! In streaming mode the mean is taken over the first few samples; the batch
//! helper uses the whole recording.
//!
//! ## Target Resolution
//!
//! Targets are `T_i = origin + i·step`, with the origin at the first sample.
//! A target is resolved once a sample later than `T + window` arrives (or at
//! flush), because no earlier sample can be closer after that point.
//!
//! ```text
//! nearest trusted sample within ±window?
//!   ├─ yes → hold it (INTERPOLATED if more than step/2 away)
//!   └─ no  → classify age of last fix at or before T
//!            ├─ LOST     → hold last fix (PREDICTED, v = 0) or skip
//!            └─ COASTING → gap filler, else capped extrapolation,
//!                          then motion limits (PREDICTED)
//! ```

use alloc::{collections::VecDeque, vec::Vec};

use crate::{
    constants::time::{COARSE_STEP_MS, FINE_STEP_MS, MS_PER_SECOND, SPARSE_INTERVAL_MS, STEP_WARMUP_SAMPLES},
    frame::{FilteredSample, FrameSource, TrajectoryFrame},
    geometry::Point2,
    limits::{capped_extrapolation, Kinematic},
    macros::{log_debug, log_warn},
    tracking::{LostPolicy, TrackState},
};

use super::{gap::GapFiller, smoothing::StreamingSmoother, ResampleConfig};

/// How the timeline step is chosen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepPolicy {
    /// From the observed native interval
    #[default]
    Adaptive,
    /// Forced step (ms)
    Fixed(f64),
}

/// Step for a given mean native interval
pub fn select_step(mean_interval_ms: f64) -> f64 {
    if mean_interval_ms <= SPARSE_INTERVAL_MS {
        FINE_STEP_MS
    } else {
        COARSE_STEP_MS
    }
}

fn usable_step(step_ms: f64) -> f64 {
    if step_ms.is_finite() && step_ms > 0.0 {
        step_ms
    } else {
        FINE_STEP_MS
    }
}

/// Mean gap between consecutive timestamps, `None` below two timestamps
pub fn mean_interval<I: IntoIterator<Item = f64>>(timestamps: I) -> Option<f64> {
    let mut iter = timestamps.into_iter();
    let first = iter.next()?;
    let (last, count) = iter.fold((first, 0usize), |(_, count), t| (t, count + 1));
    (count > 0).then(|| (last - first) / count as f64)
}

/// Counters of how targets were resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleStats {
    /// Held from a nearby sample
    pub held: u64,
    /// Filled by the gap filler
    pub predicted: u64,
    /// Filled by capped linear extrapolation
    pub extrapolated: u64,
    /// Resolved while LOST
    pub lost: u64,
    /// Left out of the output
    pub skipped: u64,
}

/// Streaming resampler for one tag
///
/// Consumes filter samples in timestamp order and emits smoothed frames on a
/// fixed-step timeline.
#[derive(Debug)]
pub struct Resampler<F: GapFiller> {
    config: ResampleConfig,
    filler: F,
    step_ms: Option<f64>,
    warmup: Vec<FilteredSample>,
    origin_ms: Option<f64>,
    next_index: u64,
    last_seen_ms: Option<f64>,
    candidates: VecDeque<FilteredSample>,
    fixes: VecDeque<FilteredSample>,
    last_fix: Option<FilteredSample>,
    emitted: Option<(f64, Kinematic)>,
    previous_position: Option<Point2>,
    filler_cleared: bool,
    smoother: StreamingSmoother,
    stats: ResampleStats,
}

impl<F: GapFiller> Resampler<F> {
    /// Create a resampler that fills gaps with `filler`
    pub fn new(config: ResampleConfig, filler: F) -> Self {
        let step_ms = match config.step {
            StepPolicy::Fixed(step) => Some(usable_step(step)),
            StepPolicy::Adaptive => None,
        };
        Self {
            smoother: StreamingSmoother::new(config.smoothing),
            config,
            filler,
            step_ms,
            warmup: Vec::with_capacity(STEP_WARMUP_SAMPLES),
            origin_ms: None,
            next_index: 0,
            last_seen_ms: None,
            candidates: VecDeque::new(),
            fixes: VecDeque::new(),
            last_fix: None,
            emitted: None,
            previous_position: None,
            filler_cleared: false,
            stats: ResampleStats::default(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Timeline step, once chosen (ms)
    pub fn step_ms(&self) -> Option<f64> {
        self.step_ms
    }

    /// Resolution counters
    pub fn stats(&self) -> ResampleStats {
        self.stats
    }

    /// Gap filler
    pub fn filler(&self) -> &F {
        &self.filler
    }

    /// Mutable gap filler
    pub fn filler_mut(&mut self) -> &mut F {
        &mut self.filler
    }

    /// Feed the next filter sample
    pub fn push(&mut self, sample: FilteredSample) {
        let timestamp = sample.timestamp_ms as f64;
        if !sample.position.is_finite() {
            log_warn!("dropping non-finite sample at {} ms", sample.timestamp_ms);
            return;
        }
        if self.last_seen_ms.map_or(false, |last| timestamp < last) {
            log_warn!("dropping out-of-order sample at {} ms", sample.timestamp_ms);
            return;
        }
        self.last_seen_ms = Some(timestamp);

        if self.step_ms.is_none() {
            self.warmup.push(sample);
            if self.warmup.len() >= STEP_WARMUP_SAMPLES {
                self.settle_step();
            }
            return;
        }
        self.ingest(sample);
    }

    /// Resolve every remaining target and release all pending frames
    pub fn flush(&mut self) {
        if self.step_ms.is_none() && !self.warmup.is_empty() {
            self.settle_step();
        }
        if let (Some(step), Some(last)) = (self.step_ms, self.last_seen_ms) {
            while self.origin_ms.is_some() && self.target(self.next_index, step) < last + step {
                self.resolve_next(step);
            }
        }
        self.smoother.flush();
    }

    /// Take the frames produced so far
    pub fn take_ready(&mut self) -> Vec<TrajectoryFrame> {
        self.smoother.take_ready()
    }

    fn settle_step(&mut self) {
        let step = match self.config.step {
            StepPolicy::Fixed(step) => usable_step(step),
            StepPolicy::Adaptive => {
                let mean = mean_interval(self.warmup.iter().map(|s| s.timestamp_ms as f64));
                select_step(mean.unwrap_or(0.0))
            }
        };
        log_debug!("timeline step {:.2} ms", step);
        self.step_ms = Some(step);
        for sample in core::mem::take(&mut self.warmup) {
            self.ingest(sample);
        }
    }

    fn target(&self, index: u64, step: f64) -> f64 {
        self.origin_ms.unwrap_or(0.0) + index as f64 * step
    }

    fn ingest(&mut self, sample: FilteredSample) {
        let Some(step) = self.step_ms else {
            return;
        };
        let timestamp = sample.timestamp_ms as f64;
        self.origin_ms.get_or_insert(timestamp);

        if sample.source == FrameSource::Measured {
            self.fixes.push_back(sample);
        }
        if sample.is_trusted() {
            self.candidates.push_back(sample);
        }

        while self.target(self.next_index, step) + self.config.gap_threshold_ms < timestamp {
            self.resolve_next(step);
        }
    }

    fn resolve_next(&mut self, step: f64) {
        let target = self.target(self.next_index, step);
        self.next_index += 1;
        let window = self.config.gap_threshold_ms;

        while self
            .candidates
            .front()
            .map_or(false, |c| (c.timestamp_ms as f64) < target - window)
        {
            self.candidates.pop_front();
        }
        while self
            .fixes
            .front()
            .map_or(false, |f| (f.timestamp_ms as f64) <= target)
        {
            if let Some(fix) = self.fixes.pop_front() {
                self.filler.observe(fix.timestamp_ms as f64, fix.position);
                self.last_fix = Some(fix);
            }
        }

        let mut nearest: Option<(f64, FilteredSample)> = None;
        for candidate in self.candidates.iter() {
            let offset = libm::fabs(candidate.timestamp_ms as f64 - target);
            if offset <= window && nearest.map_or(true, |(best, _)| offset < best) {
                nearest = Some((offset, *candidate));
            }
        }

        if let Some((offset, sample)) = nearest {
            let source = if offset > step * 0.5 {
                FrameSource::Interpolated
            } else {
                sample.source
            };
            let frame = TrajectoryFrame::new(target, sample.position, source, sample.track_state)
                .with_velocity(sample.velocity);
            self.filler_cleared = false;
            self.stats.held += 1;
            self.emit(frame, Kinematic::new(sample.position, sample.velocity));
            return;
        }

        let age = self.last_fix.map(|fix| target - fix.timestamp_ms as f64);
        match self.config.tracking.classify(age) {
            TrackState::Uninitialized => {
                self.stats.skipped += 1;
            }
            TrackState::Lost => self.resolve_lost(target),
            state => self.resolve_gap(target, step, state),
        }
    }

    fn resolve_lost(&mut self, target: f64) {
        self.stats.lost += 1;
        if !self.filler_cleared {
            self.filler.reset();
            self.filler_cleared = true;
        }

        let held = self
            .last_fix
            .map(|fix| fix.position)
            .or(self.emitted.map(|(_, k)| k.position));
        match (self.config.tracking.lost_policy, held) {
            (LostPolicy::HoldLastKnown, Some(position)) => {
                let frame = TrajectoryFrame::new(target, position, FrameSource::Predicted, TrackState::Lost)
                    .with_velocity(Point2::ZERO);
                self.emit(frame, Kinematic::at_rest(position));
            }
            _ => self.stats.skipped += 1,
        }
    }

    fn resolve_gap(&mut self, target: f64, step: f64, state: TrackState) {
        let (last_ms, last) = match (self.emitted, self.last_fix) {
            (Some(emitted), _) => emitted,
            (None, Some(fix)) => (fix.timestamp_ms as f64, Kinematic::at_rest(fix.position)),
            (None, None) => {
                self.stats.skipped += 1;
                return;
            }
        };

        let candidate = match self.filler.fill(target, &last) {
            Ok(position) if position.is_finite() => {
                self.stats.predicted += 1;
                position
            }
            _ => {
                self.stats.extrapolated += 1;
                let cap = self.config.limits.extrapolation_cap(step);
                match self.previous_position {
                    Some(previous) => capped_extrapolation(previous, last.position, cap),
                    None => last.position,
                }
            }
        };

        let dt_s = (target - last_ms).max(step) / MS_PER_SECOND;
        let constrained = self.config.limits.constrain(Some(last), candidate, dt_s);
        let frame = TrajectoryFrame::new(target, constrained.position, FrameSource::Predicted, state)
            .with_velocity(constrained.velocity);
        self.emit(frame, constrained);
    }

    fn emit(&mut self, frame: TrajectoryFrame, kinematic: Kinematic) {
        self.previous_position = self.emitted.map(|(_, k)| k.position);
        self.emitted = Some((frame.timestamp_ms, kinematic));
        self.smoother.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resample::gap::NoModel,
        resample::smoothing::SmoothingConfig,
        time::Timestamp,
        tracking::TrackingConfig,
    };

    fn sample(ts: Timestamp, x: f64, source: FrameSource, track_state: TrackState) -> FilteredSample {
        FilteredSample {
            timestamp_ms: ts,
            position: Point2::new(x, 5.0),
            velocity: Point2::new(1.0, 0.0),
            source,
            track_state,
        }
    }

    fn measured(ts: Timestamp) -> FilteredSample {
        sample(ts, 5.0 + ts as f64 / 1000.0, FrameSource::Measured, TrackState::Tracking)
    }

    fn raw_config(step: f64) -> ResampleConfig {
        ResampleConfig::default()
            .with_step(StepPolicy::Fixed(step))
            .with_smoothing(SmoothingConfig::default().with_window(1).with_jitter(None))
    }

    fn run(config: ResampleConfig, samples: &[FilteredSample]) -> Vec<TrajectoryFrame> {
        let mut resampler = Resampler::new(config, NoModel);
        let mut out = Vec::new();
        for s in samples {
            resampler.push(*s);
            out.extend(resampler.take_ready());
        }
        resampler.flush();
        out.extend(resampler.take_ready());
        out
    }

    #[test]
    fn step_selection() {
        assert_eq!(select_step(20.0), FINE_STEP_MS);
        assert_eq!(select_step(500.0), FINE_STEP_MS);
        assert_eq!(select_step(800.0), COARSE_STEP_MS);
        assert_eq!(mean_interval([0.0, 20.0, 60.0]), Some(30.0));
        assert_eq!(mean_interval([5.0]), None);
    }

    #[test]
    fn evenly_spaced_output() {
        let samples: Vec<_> = (0..50).map(|i| measured(1000 + i * 20)).collect();
        let frames = run(raw_config(10.0), &samples);

        // 1000..=1980 plus one step past the last sample
        assert_eq!(frames.len(), 99);
        for pair in frames.windows(2) {
            assert!((pair[1].timestamp_ms - pair[0].timestamp_ms - 10.0).abs() < 1e-9);
        }
        assert!(frames.iter().all(|f| f.track_state == TrackState::Tracking));
    }

    #[test]
    fn far_held_samples_are_interpolated() {
        let samples = [measured(0), measured(100)];
        let frames = run(raw_config(30.0), &samples);

        // targets 0, 30, 60, 90, 120
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].source, FrameSource::Measured);
        assert_eq!(frames[1].source, FrameSource::Interpolated);
        assert_eq!(frames[1].position, samples[0].position);
        assert_eq!(frames[2].source, FrameSource::Interpolated);
        assert_eq!(frames[2].position, samples[1].position);
        assert_eq!(frames[3].source, FrameSource::Measured);
        assert_eq!(frames[4].source, FrameSource::Interpolated);
    }

    #[test]
    fn ties_go_to_earlier_sample() {
        let samples = [measured(0), measured(80)];
        let frames = run(raw_config(40.0), &samples);
        assert_eq!(frames[1].position, samples[0].position);
    }

    #[test]
    fn gap_is_extrapolated_within_limits() {
        let mut samples: Vec<_> = (0..10).map(|i| measured(i * 20)).collect();
        samples.extend((0..5).map(|i| measured(600 + i * 20)));
        let frames = run(raw_config(20.0), &samples);

        let gap: Vec<_> = frames
            .iter()
            .filter(|f| f.timestamp_ms > 300.0 && f.timestamp_ms < 500.0)
            .collect();
        assert!(!gap.is_empty());
        for frame in &gap {
            assert_eq!(frame.source, FrameSource::Predicted);
            assert_eq!(frame.track_state, TrackState::Coasting);
        }
        for pair in frames.windows(2) {
            if pair[1].source != FrameSource::Predicted {
                continue;
            }
            let speed = pair[0].position.distance_to(&pair[1].position) / 0.02;
            assert!(speed <= 5.0 + 1e-6, "speed {} m/s", speed);
        }
    }

    #[test]
    fn lost_holds_last_known() {
        let config = raw_config(100.0).with_tracking(TrackingConfig::default().with_max_coast_ms(300));
        let samples = [measured(0), measured(20), measured(1020)];
        let mut resampler = Resampler::new(config, NoModel);
        let mut frames = Vec::new();
        for s in samples {
            resampler.push(s);
        }
        resampler.flush();
        frames.extend(resampler.take_ready());

        let lost: Vec<_> = frames.iter().filter(|f| f.track_state == TrackState::Lost).collect();
        assert!(!lost.is_empty());
        for frame in lost {
            assert_eq!(frame.position, samples[1].position);
            assert_eq!(frame.velocity, Some(Point2::ZERO));
            assert_eq!(frame.source, FrameSource::Predicted);
        }
        assert_eq!(frames.last().map(|f| f.track_state), Some(TrackState::Tracking));
        assert!(resampler.stats().lost > 0);
    }

    #[test]
    fn lost_gap_policy_skips_frames() {
        let config = raw_config(100.0).with_tracking(
            TrackingConfig::default()
                .with_max_coast_ms(300)
                .with_lost_policy(LostPolicy::Gap),
        );
        let frames = run(config, &[measured(0), measured(20), measured(1020)]);

        assert!(frames.iter().all(|f| f.track_state != TrackState::Lost));
        // 0 and 100 held, 200..=300 coasting, 400..=900 skipped, 1000 and 1100 held
        assert!(frames.iter().all(|f| f.timestamp_ms < 350.0 || f.timestamp_ms > 950.0));
    }

    #[test]
    fn lost_predictions_are_not_held() {
        let samples = [
            measured(0),
            sample(40, 9.0, FrameSource::Predicted, TrackState::Lost),
        ];
        let config = raw_config(40.0).with_tracking(TrackingConfig::default().with_max_coast_ms(10));
        let frames = run(config, &samples);
        assert!(frames.iter().all(|f| f.position.x != 9.0));
    }

    #[test]
    fn adaptive_step_from_warmup() {
        let samples: Vec<_> = (0..20).map(|i| measured(i * 20)).collect();
        let config = ResampleConfig::default()
            .with_smoothing(SmoothingConfig::default().with_window(1).with_jitter(None));
        let mut resampler = Resampler::new(config, NoModel);
        for s in &samples {
            resampler.push(*s);
        }
        assert_eq!(resampler.step_ms(), Some(FINE_STEP_MS));
    }

    #[test]
    fn out_of_order_samples_are_dropped() {
        let frames = run(raw_config(20.0), &[measured(100), measured(50), measured(120)]);
        assert_eq!(frames.first().map(|f| f.timestamp_ms), Some(100.0));
    }
}
