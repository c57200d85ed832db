//! Time handling for ranging streams
//!
//! Every record carries two clocks:
//! - the tag's device clock (when ranging happened)
//! - the collector's system clock (when the record arrived)
//!
//! Windowing and filtering use one of them consistently; the other is kept
//! for diagnostics. Timestamps are milliseconds.

use crate::constants::time::MS_PER_SECOND;

/// Timestamp in milliseconds (device boot or epoch, depending on the clock)
pub type Timestamp = u64;

/// Which clock orders a tag's stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockSource {
    /// Tag device timestamp
    #[default]
    Device,
    /// Collector arrival timestamp
    System,
}

/// Elapsed seconds from `earlier` to `later`, zero if time went backwards
pub fn elapsed_secs(earlier: Timestamp, later: Timestamp) -> f64 {
    later.saturating_sub(earlier) as f64 / MS_PER_SECOND
}

/// Guards the monotonic-timestamp invariant of a single tag's stream
///
/// Records with a timestamp older than the last accepted one are refused;
/// equal timestamps are allowed.
#[derive(Debug, Clone, Default)]
pub struct MonotonicGuard {
    last: Option<Timestamp>,
    rejected: u32,
}

impl MonotonicGuard {
    /// Create a guard that has seen nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `timestamp` if it does not go backwards
    pub fn accept(&mut self, timestamp: Timestamp) -> bool {
        match self.last {
            Some(last) if timestamp < last => {
                self.rejected += 1;
                false
            }
            _ => {
                self.last = Some(timestamp);
                true
            }
        }
    }

    /// Last accepted timestamp
    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }

    /// Number of out-of-order timestamps refused
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Forget history, e.g. when a session restarts
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed_secs(1000, 1500), 0.5);
        assert_eq!(elapsed_secs(1500, 1000), 0.0);
    }

    #[test]
    fn guard_refuses_backwards_time() {
        let mut guard = MonotonicGuard::new();
        assert!(guard.accept(100));
        assert!(guard.accept(100));
        assert!(guard.accept(120));
        assert!(!guard.accept(110));
        assert_eq!(guard.last(), Some(120));
        assert_eq!(guard.rejected(), 1);

        guard.reset();
        assert!(guard.accept(50));
    }
}
