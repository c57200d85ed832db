//! Moving-average smoothing and distance accumulation
//!
//! ## Moving Average
//!
//! Centred window of `2h + 1` frames. Frames closer than `h` to either end
//! only see a partial window, so their average is blended with the frame
//! itself:
//!
//! ```text
//! interior:  p'[i] = mean(p[i−h ..= i+h])
//! edge:      p'[i] = w·mean(p[max(0,i−h) ..= min(n−1,i+h)]) + (1 − w)·p[i]
//! ```
//!
//! ## Streaming
//!
//! [`StreamingSmoother`] produces exactly the batch result frame by frame.
//! Jitter correction needs the next raw frame and the moving average needs
//! `h` corrected frames ahead, so a frame leaves the smoother `h + 1` frames
//! after it entered. [`StreamingSmoother::flush`] releases the tail.

use alloc::{collections::VecDeque, vec::Vec};

use crate::{
    constants::resample::{EDGE_BLEND_WEIGHT, SMOOTHING_WINDOW},
    frame::TrajectoryFrame,
    geometry::Point2,
};

use super::jitter::{correct_jitter, JitterConfig};

/// Smoothing stage configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmoothingConfig {
    /// Moving-average window (frames, odd)
    pub window: usize,
    /// Weight of the partial average on edge frames
    pub edge_blend: f64,
    /// Jitter correction, `None` to disable
    pub jitter: Option<JitterConfig>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: SMOOTHING_WINDOW,
            edge_blend: EDGE_BLEND_WEIGHT,
            jitter: Some(JitterConfig::default()),
        }
    }
}

impl SmoothingConfig {
    /// Set the window; even sizes grow to the next odd size
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1) | 1;
        self
    }

    /// Set or disable jitter correction
    pub fn with_jitter(mut self, jitter: Option<JitterConfig>) -> Self {
        self.jitter = jitter;
        self
    }

    fn half(&self) -> usize {
        self.window / 2
    }
}

fn mean<I: Iterator<Item = Point2>>(points: I) -> Point2 {
    let (sum, count) = points.fold((Point2::ZERO, 0usize), |(sum, count), p| (sum + p, count + 1));
    if count == 0 {
        return Point2::ZERO;
    }
    sum * (1.0 / count as f64)
}

fn blend(average: Point2, original: Point2, edge: bool, weight: f64) -> Point2 {
    if edge {
        average * weight + original * (1.0 - weight)
    } else {
        average
    }
}

/// Centred moving average over a position sequence
pub fn moving_average(points: &[Point2], window: usize, edge_blend: f64) -> Vec<Point2> {
    let n = points.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let edge = i < half || i + half >= n;
            blend(mean(points[lo..hi].iter().copied()), points[i], edge, edge_blend)
        })
        .collect()
}

/// Fill in `cumulative_distance` as the running sum of frame-to-frame moves
pub fn accumulate_distance(frames: &mut [TrajectoryFrame]) {
    let mut total = 0.0;
    let mut previous: Option<Point2> = None;
    for frame in frames.iter_mut() {
        if let Some(prev) = previous {
            total += prev.distance_to(&frame.position);
        }
        frame.cumulative_distance = total;
        previous = Some(frame.position);
    }
}

/// Batch jitter correction, smoothing and distance accumulation
pub fn smooth_frames(config: &SmoothingConfig, frames: &[TrajectoryFrame]) -> Vec<TrajectoryFrame> {
    let mut corrected = match &config.jitter {
        Some(jitter) => correct_jitter(jitter, frames),
        None => frames.to_vec(),
    };
    let positions: Vec<Point2> = corrected.iter().map(|f| f.position).collect();
    let smoothed = moving_average(&positions, config.window, config.edge_blend);
    for (frame, position) in corrected.iter_mut().zip(smoothed) {
        frame.position = position;
    }
    accumulate_distance(&mut corrected);
    corrected
}

/// Incremental version of [`smooth_frames`]
#[derive(Debug, Clone)]
pub struct StreamingSmoother {
    config: SmoothingConfig,
    /// Last uncorrected frames, at most two
    raw: VecDeque<TrajectoryFrame>,
    seen: usize,
    /// Corrected frames still needed by a pending average
    corrected: VecDeque<TrajectoryFrame>,
    /// Index of `corrected[0]` in the whole sequence
    base: usize,
    total: usize,
    next: usize,
    last_position: Option<Point2>,
    distance: f64,
    ready: Vec<TrajectoryFrame>,
}

impl StreamingSmoother {
    /// Create a smoother
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            raw: VecDeque::with_capacity(3),
            seen: 0,
            corrected: VecDeque::new(),
            base: 0,
            total: 0,
            next: 0,
            last_position: None,
            distance: 0.0,
            ready: Vec::new(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Feed the next raw frame
    pub fn push(&mut self, frame: TrajectoryFrame) {
        let Some(jitter) = self.config.jitter else {
            self.push_corrected(frame);
            self.emit(false);
            return;
        };

        if self.seen == 0 {
            self.push_corrected(frame);
        }
        self.seen += 1;
        self.raw.push_back(frame);

        if self.raw.len() == 3 {
            let middle = jitter.correct(&self.raw[0], &self.raw[1], &self.raw[2]);
            self.push_corrected(middle);
            self.raw.pop_front();
        }
        self.emit(false);
    }

    /// Release every pending frame; the smoother can then start a new sequence
    pub fn flush(&mut self) {
        if self.config.jitter.is_some() && self.seen >= 2 {
            if let Some(last) = self.raw.back().copied() {
                self.push_corrected(last);
            }
        }
        self.emit(true);

        self.raw.clear();
        self.seen = 0;
        self.corrected.clear();
        self.base = 0;
        self.total = 0;
        self.next = 0;
    }

    /// Take the frames smoothed so far
    pub fn take_ready(&mut self) -> Vec<TrajectoryFrame> {
        core::mem::take(&mut self.ready)
    }

    /// Distance travelled by the released frames (m)
    pub fn distance(&self) -> f64 {
        self.distance
    }

    fn push_corrected(&mut self, frame: TrajectoryFrame) {
        self.corrected.push_back(frame);
        self.total += 1;
    }

    fn emit(&mut self, last: bool) {
        let half = self.config.half();
        while self.next < self.total && (last || self.next + half < self.total) {
            let j = self.next;
            let lo = j.saturating_sub(half);
            let hi = (j + half + 1).min(self.total);
            let edge = j < half || (last && j + half >= self.total);

            let average = mean((lo..hi).map(|k| self.corrected[k - self.base].position));
            let mut frame = self.corrected[j - self.base];
            frame.position = blend(average, frame.position, edge, self.config.edge_blend);

            if let Some(prev) = self.last_position {
                self.distance += prev.distance_to(&frame.position);
            }
            frame.cumulative_distance = self.distance;
            self.last_position = Some(frame.position);
            self.ready.push(frame);

            self.next += 1;
            while self.base < self.next.saturating_sub(half) {
                self.corrected.pop_front();
                self.base += 1;
            }
        }
    }
}
