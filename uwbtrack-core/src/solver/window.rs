//! Ranging windows
//!
//! Groups one tag's ranges into short windows. A window opens at the first
//! record and accepts records until `window_ms` has elapsed, so every batch
//! covers `(t − window_ms, t]` for its final timestamp `t`. Only the latest
//! valid range per anchor is kept.

use heapless::Vec;

use crate::{
    constants::{
        solver::{MAX_ANCHORS_PER_WINDOW, MIN_RSSI_DBM},
        time::RANGE_WINDOW_MS,
    },
    macros::log_warn,
    measurement::{RangeMeasurement, TagId},
    time::{ClockSource, MonotonicGuard, Timestamp},
};

/// Windowing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowConfig {
    /// Window length (ms)
    pub window_ms: Timestamp,
    /// Clock that orders the stream
    pub clock: ClockSource,
    /// Weakest signal accepted (dBm)
    pub min_signal_dbm: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_ms: RANGE_WINDOW_MS,
            clock: ClockSource::Device,
            min_signal_dbm: MIN_RSSI_DBM,
        }
    }
}

impl WindowConfig {
    /// Set the window length
    pub fn with_window_ms(mut self, window_ms: Timestamp) -> Self {
        self.window_ms = window_ms.max(1);
        self
    }

    /// Set the ordering clock
    pub fn with_clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }
}

/// Ranges of one tag collected over one window
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBatch {
    /// Tag the ranges belong to
    pub tag_id: TagId,
    /// Timestamp of the first record in the window (ms)
    pub start_ms: Timestamp,
    /// Timestamp of the latest record in the window (ms)
    pub timestamp_ms: Timestamp,
    /// Latest valid range per anchor
    pub ranges: Vec<RangeMeasurement, MAX_ANCHORS_PER_WINDOW>,
    /// Records dropped as invalid (failed anchor, bad distance, weak signal)
    pub invalid: u16,
}

impl RangeBatch {
    fn open(tag_id: TagId, timestamp_ms: Timestamp) -> Self {
        Self {
            tag_id,
            start_ms: timestamp_ms,
            timestamp_ms,
            ranges: Vec::new(),
            invalid: 0,
        }
    }

    /// Number of valid anchor ranges
    pub fn valid_count(&self) -> usize {
        self.ranges.len()
    }

    fn add(&mut self, measurement: RangeMeasurement, timestamp_ms: Timestamp, valid: bool) {
        self.timestamp_ms = self.timestamp_ms.max(timestamp_ms);
        if !valid {
            self.invalid = self.invalid.saturating_add(1);
            return;
        }

        if let Some(existing) = self
            .ranges
            .iter_mut()
            .find(|r| r.anchor_id == measurement.anchor_id)
        {
            *existing = measurement;
        } else if self.ranges.push(measurement).is_err() {
            log_warn!("window full, dropping range from anchor {}", measurement.anchor_id);
            self.invalid = self.invalid.saturating_add(1);
        }
    }
}

/// Splits a single tag's measurement stream into ranging windows
#[derive(Debug, Clone)]
pub struct RangeWindower {
    config: WindowConfig,
    current: Option<RangeBatch>,
    guard: MonotonicGuard,
}

impl RangeWindower {
    /// Create a windower
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            current: None,
            guard: MonotonicGuard::new(),
        }
    }

    /// Configuration
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Add a measurement; returns the previous window once it is complete
    ///
    /// Records older than the last accepted one break the per-tag ordering
    /// and are dropped.
    pub fn push(&mut self, measurement: RangeMeasurement) -> Option<RangeBatch> {
        let timestamp = measurement.timestamp(self.config.clock);
        if !self.guard.accept(timestamp) {
            log_warn!(
                "tag {}: dropping out-of-order range at {} ms",
                measurement.tag_id,
                timestamp
            );
            return None;
        }

        let window_ms = self.config.window_ms;
        let closed = self
            .current
            .as_ref()
            .map_or(false, |batch| timestamp >= batch.start_ms + window_ms);
        let completed = if closed { self.current.take() } else { None };

        let batch = self
            .current
            .get_or_insert_with(|| RangeBatch::open(measurement.tag_id, timestamp));
        let valid = measurement.is_valid(self.config.min_signal_dbm);
        batch.add(measurement, timestamp, valid);

        completed
    }

    /// Close the open window, if any
    pub fn flush(&mut self) -> Option<RangeBatch> {
        self.current.take()
    }

    /// Out-of-order records refused so far
    pub fn out_of_order(&self) -> u32 {
        self.guard.rejected()
    }
}
