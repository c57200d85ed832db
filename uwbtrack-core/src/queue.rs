//! Ingest Queue for Ranging Records
//!
//! ## Overview
//!
//! The hand-off between an external ranging source (a network callback, a
//! serial reader) and the processing pipeline. Producers on any thread push
//! records; the tracker drains them in arrival order.
//!
//! ```text
//! Producer threads                     Tracker
//!      ↓      ↓                           ↓
//!    push   push ──→ Mutex<VecDeque> ──→ pop / drain
//!      ↓      ↓                           ↓
//!   backpressure                      per-tag sessions
//! ```
//!
//! ## Backpressure
//!
//! The queue is bounded. When it is full the configured strategy decides:
//!
//! | Strategy | Effect | Use case |
//! |----------|--------|----------|
//! | `DropOldest` | evict the head, keep the new record | live display, freshness first |
//! | `DropNewest` | discard the new record | replay, history first |
//! | `Reject` | refuse with `QueueFull` | producer can retry or slow down |
//!
//! ## Shutdown
//!
//! `close()` stops accepting records. Records already queued can still be
//! drained, so nothing accepted is ever lost on shutdown.
//!
//! ## Statistics
//!
//! Counters are atomics updated with relaxed ordering; they are monitoring
//! data only and never drive control flow.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{
    errors::{TrackError, TrackResult},
    macros::log_warn,
    measurement::RangeMeasurement,
};

/// Default queue capacity (records)
///
/// About two seconds of traffic for 16 tags ranging 4 anchors at 20 Hz.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// What to do with a record when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverflowStrategy {
    /// Evict the oldest queued record
    #[default]
    DropOldest,
    /// Discard the incoming record
    DropNewest,
    /// Refuse the incoming record with `QueueFull`
    Reject,
}

/// Queue sizing and overflow behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueConfig {
    /// Maximum queued records
    pub capacity: usize,
    /// Behaviour when full
    pub overflow: OverflowStrategy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowStrategy::default(),
        }
    }
}

impl QueueConfig {
    /// Set the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the overflow strategy
    pub fn with_overflow(mut self, overflow: OverflowStrategy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Build the queue
    pub fn build(self) -> IngestQueue {
        IngestQueue::new(self.capacity, self.overflow)
    }
}

/// Queue health counters
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Records accepted
    pub pushed: AtomicU64,
    /// Records handed to the consumer
    pub popped: AtomicU64,
    /// Records lost to overflow (either end)
    pub dropped: AtomicU64,
    /// Records refused with `QueueFull` or `QueueClosed`
    pub rejected: AtomicU64,
    /// Deepest the queue has been
    pub max_depth: AtomicU64,
}

impl QueueStats {
    fn update_max_depth(&self, current: u64) {
        self.max_depth.fetch_max(current, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`QueueStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Records accepted
    pub pushed: u64,
    /// Records handed to the consumer
    pub popped: u64,
    /// Records lost to overflow
    pub dropped: u64,
    /// Records refused
    pub rejected: u64,
    /// Deepest the queue has been
    pub max_depth: u64,
}

/// Bounded multi-producer queue of ranging records
#[derive(Debug)]
pub struct IngestQueue {
    records: Mutex<VecDeque<RangeMeasurement>>,
    capacity: usize,
    strategy: OverflowStrategy,
    closed: AtomicBool,
    stats: QueueStats,
}

impl Default for IngestQueue {
    fn default() -> Self {
        QueueConfig::default().build()
    }
}

impl IngestQueue {
    /// Create a queue holding at most `capacity` records
    pub fn new(capacity: usize, strategy: OverflowStrategy) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            capacity,
            strategy,
            closed: AtomicBool::new(false),
            stats: QueueStats::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RangeMeasurement>> {
        // poisoned lock still guards a consistent VecDeque
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offer a record
    ///
    /// `Ok(())` also covers records that were dropped by the overflow
    /// strategy; only `Reject` and a closed queue return errors.
    pub fn push(&self, record: RangeMeasurement) -> TrackResult<()> {
        if self.is_closed() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(TrackError::QueueClosed);
        }

        let mut records = self.lock();
        if records.len() >= self.capacity {
            match self.strategy {
                OverflowStrategy::DropOldest => {
                    records.pop_front();
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                OverflowStrategy::DropNewest => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    log_warn!("ingest queue full, dropping record for tag {}", record.tag_id);
                    return Ok(());
                }
                OverflowStrategy::Reject => {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    return Err(TrackError::QueueFull);
                }
            }
        }

        records.push_back(record);
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(records.len() as u64);
        Ok(())
    }

    /// Take the oldest record
    pub fn pop(&self) -> Option<RangeMeasurement> {
        let record = self.lock().pop_front();
        if record.is_some() {
            self.stats.popped.fetch_add(1, Ordering::Relaxed);
        }
        record
    }

    /// Take every queued record in arrival order
    pub fn drain(&self) -> Vec<RangeMeasurement> {
        let drained: Vec<_> = self.lock().drain(..).collect();
        self.stats.popped.fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    /// Stop accepting records
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closed and fully drained
    pub fn is_finished(&self) -> bool {
        self.is_closed() && self.is_empty()
    }

    /// Records currently queued
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of queued records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Overflow strategy
    pub fn strategy(&self) -> OverflowStrategy {
        self.strategy
    }

    /// Health counters
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
