//! Gaussian-process trajectory predictor
//!
//! Keeps the most recent trusted fixes of one tag and fits independent GPs
//! for `x(t)` and `y(t)` over time normalised to `[0, 1]` across the window.
//! A fitted model is cached as `(model, valid_until)` and only refitted once
//! it is stale, never per output frame.
//!
//! Every predicted point is passed through the sport's [`MotionLimits`] with
//! the speed ceiling tightened by the recent [`MotionContext`]:
//!
//! ```text
//! history ──→ TrainedModel::train ──→ raw GP mean
//!                                       │
//!                 clamp to area, |Δv| ≤ a·Δt, |v| ≤ cap
//!                                       ▼
//!                                 predicted point
//! ```
//!
//! With too little history the predictor reports `PredictionUnavailable`;
//! [`TrajectoryPredictor::predict_or_extrapolate`] then falls back to capped
//! linear extrapolation from the last two fixes.

use alloc::vec::Vec;

use heapless::Deque;
use uwbtrack_core::{
    constants::{time::RETRAIN_INTERVAL_MS, MS_PER_SECOND},
    limits::capped_extrapolation,
    GapFiller, Kinematic, MotionLimits, Point2, TrackError, TrackResult,
};

use crate::{
    gp::GaussianProcess,
    kernel::KernelConfig,
    macros::{log_debug, log_warn},
    motion::{MotionConfig, MotionContext},
};

/// Fixes kept for training by default
pub const HISTORY_WINDOW: usize = 10;

/// Hard capacity of the history buffer
pub const MAX_HISTORY: usize = 32;

/// Distinct timestamps needed before a model is fitted
pub const MIN_TRAINING_SAMPLES: usize = 5;

/// Predictor settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictorConfig {
    /// Fixes kept for training, at most [`MAX_HISTORY`]
    pub history_window: usize,
    /// Distinct timestamps needed to fit
    pub min_samples: usize,
    /// Age after which a fitted model is refitted (ms)
    pub retrain_interval_ms: f64,
    /// Kernel for both axes
    pub kernel: KernelConfig,
    /// Sprint detection
    pub motion: MotionConfig,
    /// Area, speed and acceleration limits of the sport
    pub limits: MotionLimits,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            history_window: HISTORY_WINDOW,
            min_samples: MIN_TRAINING_SAMPLES,
            retrain_interval_ms: RETRAIN_INTERVAL_MS,
            kernel: KernelConfig::default(),
            motion: MotionConfig::default(),
            limits: MotionLimits::default(),
        }
    }
}

impl PredictorConfig {
    /// Set the history window
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window.clamp(2, MAX_HISTORY);
        self
    }

    /// Set the minimum number of distinct timestamps
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples.max(2);
        self
    }

    /// Set the retrain interval
    pub fn with_retrain_interval(mut self, retrain_interval_ms: f64) -> Self {
        self.retrain_interval_ms = retrain_interval_ms.max(0.0);
        self
    }

    /// Set the kernel
    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the sprint detection
    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Set the motion limits
    pub fn with_limits(mut self, limits: MotionLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Fitted x/y models with their validity
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    x: GaussianProcess,
    y: GaussianProcess,
    origin_ms: f64,
    span_ms: f64,
    context: MotionContext,
    trained_at_ms: f64,
    valid_until_ms: f64,
}

impl TrainedModel {
    /// Fit a model to `history` at time `now_ms`
    ///
    /// `history` must be in time order. Fails with `PredictionUnavailable`
    /// when there are fewer than `min_samples` distinct timestamps or the
    /// window has no time extent.
    pub fn train(config: &PredictorConfig, history: &[(f64, Point2)], now_ms: f64) -> TrackResult<Self> {
        let distinct = history
            .windows(2)
            .filter(|pair| pair[1].0 > pair[0].0)
            .count()
            + usize::from(!history.is_empty());
        if distinct < config.min_samples {
            return Err(TrackError::PredictionUnavailable {
                reason: "insufficient history",
            });
        }

        let (first, last) = match (history.first(), history.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => {
                return Err(TrackError::PredictionUnavailable {
                    reason: "insufficient history",
                })
            }
        };
        let span_ms = last - first;
        if !(span_ms > 0.0) {
            return Err(TrackError::PredictionUnavailable {
                reason: "degenerate time range",
            });
        }

        let inputs: Vec<f64> = history.iter().map(|(ts, _)| (ts - first) / span_ms).collect();
        let xs: Vec<f64> = history.iter().map(|(_, p)| p.x).collect();
        let ys: Vec<f64> = history.iter().map(|(_, p)| p.y).collect();

        Ok(Self {
            x: GaussianProcess::fit(config.kernel, &inputs, &xs)?,
            y: GaussianProcess::fit(config.kernel, &inputs, &ys)?,
            origin_ms: first,
            span_ms,
            context: MotionContext::from_history(&config.motion, history),
            trained_at_ms: now_ms,
            valid_until_ms: now_ms + config.retrain_interval_ms,
        })
    }

    /// Whether the model may still be used at `now_ms`
    pub fn is_valid_at(&self, now_ms: f64) -> bool {
        now_ms >= self.trained_at_ms && now_ms < self.valid_until_ms
    }

    /// Unconstrained GP mean at `timestamp_ms`
    pub fn raw_position(&self, timestamp_ms: f64) -> Point2 {
        let t = (timestamp_ms - self.origin_ms) / self.span_ms;
        Point2::new(self.x.predict(t), self.y.predict(t))
    }

    /// Motion context of the training window
    pub fn context(&self) -> &MotionContext {
        &self.context
    }

    /// End of validity (ms)
    pub fn valid_until_ms(&self) -> f64 {
        self.valid_until_ms
    }

    /// Selected length-scales for x and y
    pub fn length_scales(&self) -> (f64, f64) {
        (self.x.length_scale(), self.y.length_scale())
    }
}

/// Predictor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictorStats {
    /// Successful fits
    pub trainings: u64,
    /// Fits that failed
    pub failed_trainings: u64,
    /// Points produced by the model
    pub predictions: u64,
    /// Points produced by linear extrapolation
    pub extrapolations: u64,
}

/// Per-tag trajectory predictor
#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    config: PredictorConfig,
    history: Deque<(f64, Point2), MAX_HISTORY>,
    cache: Option<TrainedModel>,
    last_output_ms: Option<f64>,
    stats: PredictorStats,
}

impl Default for TrajectoryPredictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl TrajectoryPredictor {
    /// Create a predictor
    pub fn new(config: PredictorConfig) -> Self {
        let config = config.with_history_window(config.history_window);
        Self {
            config,
            history: Deque::new(),
            cache: None,
            last_output_ms: None,
            stats: PredictorStats::default(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Counters
    pub fn stats(&self) -> PredictorStats {
        self.stats
    }

    /// Cached model, if any
    pub fn model(&self) -> Option<&TrainedModel> {
        self.cache.as_ref()
    }

    /// Fixes currently held, oldest first
    pub fn history(&self) -> impl Iterator<Item = &(f64, Point2)> {
        self.history.iter()
    }

    /// Record a trusted fix
    ///
    /// Non-finite or out-of-order fixes are ignored; a fix at the same
    /// timestamp as the newest one replaces it.
    pub fn observe(&mut self, timestamp_ms: f64, position: Point2) {
        if !timestamp_ms.is_finite() || !position.is_finite() {
            return;
        }
        match self.history.back() {
            Some(&(last, _)) if timestamp_ms < last => return,
            Some(&(last, _)) if timestamp_ms == last => {
                self.history.pop_back();
            }
            _ => {}
        }
        while self.history.len() >= self.config.history_window {
            self.history.pop_front();
        }
        // capacity is checked by the loop above
        let _ = self.history.push_back((timestamp_ms, position));
        self.last_output_ms = None;
    }

    /// Drop history and model
    pub fn reset(&mut self) {
        self.history.clear();
        self.cache = None;
        self.last_output_ms = None;
    }

    fn history_vec(&self) -> Vec<(f64, Point2)> {
        self.history.iter().copied().collect()
    }

    /// Model valid at `now_ms`, refitting when stale or missing
    pub fn refresh(&mut self, now_ms: f64) -> TrackResult<&TrainedModel> {
        let fresh = self.cache.as_ref().map_or(false, |m| m.is_valid_at(now_ms));
        if !fresh {
            match TrainedModel::train(&self.config, &self.history_vec(), now_ms) {
                Ok(model) => {
                    log_debug!(
                        "predictor retrained at {:.0} ms on {} fixes, length-scales {:?}",
                        now_ms,
                        self.history.len(),
                        model.length_scales()
                    );
                    self.stats.trainings += 1;
                    self.cache = Some(model);
                }
                Err(err) => {
                    self.stats.failed_trainings += 1;
                    self.cache = None;
                    return Err(err);
                }
            }
        }
        self.cache.as_ref().ok_or(TrackError::PredictionUnavailable { reason: "untrained" })
    }

    /// Limits with the speed ceiling of `context`
    fn capped_limits(&self, context: &MotionContext) -> MotionLimits {
        let cap = context.speed_cap(&self.config.motion, self.config.limits.max_speed_mps);
        self.config.limits.with_max_speed(cap)
    }

    /// Last fix with the velocity of the last segment
    fn anchor_point(&self) -> Option<(f64, Kinematic)> {
        let mut newest = self.history.iter().rev();
        let &(ts, position) = newest.next()?;
        let velocity = match newest.next() {
            Some(&(prev_ts, prev)) if ts > prev_ts => (position - prev) * (MS_PER_SECOND / (ts - prev_ts)),
            _ => Point2::ZERO,
        };
        Some((ts, Kinematic::new(position, velocity)))
    }

    /// Constrained model positions for increasing `timestamps` after the last fix
    ///
    /// Consecutive points respect the speed cap and acceleration limit and
    /// all points lie inside the area. A timestamp not after its predecessor
    /// repeats the previous point.
    pub fn predict_path(&mut self, timestamps: &[f64]) -> TrackResult<Vec<Point2>> {
        let (mut previous_ms, mut previous) = self.anchor_point().ok_or(TrackError::PredictionUnavailable {
            reason: "no history",
        })?;
        let now = timestamps.first().copied().unwrap_or(previous_ms);
        let model = self.refresh(now)?.clone();
        let limits = self.capped_limits(model.context());

        let mut path = Vec::with_capacity(timestamps.len());
        for &ts in timestamps {
            if ts > previous_ms {
                let dt_s = (ts - previous_ms) / MS_PER_SECOND;
                previous = limits.constrain(Some(previous), model.raw_position(ts), dt_s);
                previous_ms = ts;
            }
            path.push(previous.position);
        }
        self.stats.predictions += path.len() as u64;
        Ok(path)
    }

    /// Capped linear extrapolation from the last two fixes
    ///
    /// Empty when no fix has been observed.
    pub fn extrapolate_path(&mut self, timestamps: &[f64]) -> Vec<Point2> {
        let Some((mut previous_ms, mut previous)) = self.anchor_point() else {
            return Vec::new();
        };
        let limits = self.config.limits;
        let mut before = self
            .history
            .iter()
            .rev()
            .nth(1)
            .map_or(previous.position, |&(_, p)| p);

        let mut path = Vec::with_capacity(timestamps.len());
        for &ts in timestamps {
            if ts > previous_ms {
                let step_ms = ts - previous_ms;
                let candidate = capped_extrapolation(before, previous.position, limits.extrapolation_cap(step_ms));
                before = previous.position;
                previous = limits.constrain(Some(previous), candidate, step_ms / MS_PER_SECOND);
                previous_ms = ts;
            }
            path.push(previous.position);
        }
        self.stats.extrapolations += path.len() as u64;
        path
    }

    /// Model path, or the extrapolated path when no model can be fitted
    pub fn predict_or_extrapolate(&mut self, timestamps: &[f64]) -> Vec<Point2> {
        match self.predict_path(timestamps) {
            Ok(path) => path,
            Err(_err) => {
                log_warn!("prediction unavailable ({}), extrapolating", _err);
                self.extrapolate_path(timestamps)
            }
        }
    }
}

impl GapFiller for TrajectoryPredictor {
    fn observe(&mut self, timestamp_ms: f64, position: Point2) {
        TrajectoryPredictor::observe(self, timestamp_ms, position);
    }

    fn fill(&mut self, timestamp_ms: f64, last: &Kinematic) -> TrackResult<Point2> {
        let reference_ms = match (self.last_output_ms, self.history.back()) {
            (Some(output), _) => output,
            (None, Some(&(fix, _))) => fix,
            (None, None) => {
                return Err(TrackError::PredictionUnavailable { reason: "no history" });
            }
        };
        let (raw, context) = {
            let model = self.refresh(timestamp_ms)?;
            (model.raw_position(timestamp_ms), *model.context())
        };
        let limits = self.capped_limits(&context);

        self.last_output_ms = Some(timestamp_ms.max(reference_ms));
        let dt_s = (timestamp_ms - reference_ms) / MS_PER_SECOND;
        if !(dt_s > 0.0) {
            return Ok(last.position);
        }
        self.stats.predictions += 1;
        Ok(limits.constrain(Some(*last), raw, dt_s).position)
    }

    fn reset(&mut self) {
        TrajectoryPredictor::reset(self);
    }
}
