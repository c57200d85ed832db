//! Tag tracking state machine
//!
//! ```text
//!                 fix                     no fix
//! UNINITIALIZED ───────→ TRACKING ←──────────────→ COASTING
//!                           ↑         fix               │ age > max_coast
//!                           │                           ↓
//!                           └──────── fix ────────── LOST
//! ```
//!
//! The state is a pure function of the age of the last valid fix, which
//! makes it reproducible on both the filter side (per native sample) and
//! the resampler side (per timeline target). There is no terminal state;
//! a session simply ends.

use crate::{
    constants::time::DEFAULT_MAX_COAST_MS,
    macros::log_warn,
    time::Timestamp,
};

/// Tracking state of one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackState {
    /// No valid fix seen yet
    #[default]
    Uninitialized,
    /// Recent valid fix available
    Tracking,
    /// Predict-only, last fix younger than the coast limit
    Coasting,
    /// Last fix older than the coast limit; predictions are not trusted
    Lost,
}

impl TrackState {
    /// Upper-case label used in exported records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Tracking => "TRACKING",
            Self::Coasting => "COASTING",
            Self::Lost => "LOST",
        }
    }
}

/// What the resampler emits for instants when a track is LOST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LostPolicy {
    /// Repeat the last known position with zero velocity
    #[default]
    HoldLastKnown,
    /// Emit no frame; the timeline shows an explicit gap
    Gap,
}

/// Tracking configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingConfig {
    /// Longest time a track may coast before it is LOST (ms)
    pub max_coast_ms: Timestamp,
    /// Output behaviour while LOST
    pub lost_policy: LostPolicy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_coast_ms: DEFAULT_MAX_COAST_MS,
            lost_policy: LostPolicy::HoldLastKnown,
        }
    }
}

impl TrackingConfig {
    /// Set the coast limit
    pub fn with_max_coast_ms(mut self, max_coast_ms: Timestamp) -> Self {
        self.max_coast_ms = max_coast_ms;
        self
    }

    /// Set the LOST output behaviour
    pub fn with_lost_policy(mut self, lost_policy: LostPolicy) -> Self {
        self.lost_policy = lost_policy;
        self
    }

    /// State for an instant whose last valid fix is `age_ms` old
    ///
    /// `None` means no fix has ever been seen.
    pub fn classify(&self, age_ms: Option<f64>) -> TrackState {
        match age_ms {
            None => TrackState::Uninitialized,
            Some(age) if age <= 0.0 => TrackState::Tracking,
            Some(age) if age <= self.max_coast_ms as f64 => TrackState::Coasting,
            Some(_) => TrackState::Lost,
        }
    }
}

/// Per-tag state machine driven by native samples
#[derive(Debug, Clone, Default)]
pub struct Track {
    config: TrackingConfig,
    state: TrackState,
    last_fix_ms: Option<Timestamp>,
}

impl Track {
    /// New track in UNINITIALIZED
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            state: TrackState::Uninitialized,
            last_fix_ms: None,
        }
    }

    /// Current state
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Timestamp of the last valid fix
    pub fn last_fix_ms(&self) -> Option<Timestamp> {
        self.last_fix_ms
    }

    /// Configuration
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Advance with a sample at `timestamp`, with or without a valid fix
    pub fn observe(&mut self, timestamp: Timestamp, has_fix: bool) -> TrackState {
        if has_fix {
            self.last_fix_ms = Some(timestamp);
        }
        let age = self
            .last_fix_ms
            .map(|last| timestamp.saturating_sub(last) as f64);
        let next = self.config.classify(age);

        if next == TrackState::Lost && self.state != TrackState::Lost {
            log_warn!("track lost: no valid fix for {:?} ms", age);
        }
        self.state = next;
        next
    }

    /// Whether the next fix re-acquires a lost or unseeded track
    pub fn needs_reseed(&self) -> bool {
        matches!(self.state, TrackState::Uninitialized | TrackState::Lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_age() {
        let config = TrackingConfig::default().with_max_coast_ms(500);

        assert_eq!(config.classify(None), TrackState::Uninitialized);
        assert_eq!(config.classify(Some(0.0)), TrackState::Tracking);
        assert_eq!(config.classify(Some(100.0)), TrackState::Coasting);
        assert_eq!(config.classify(Some(500.0)), TrackState::Coasting);
        assert_eq!(config.classify(Some(500.1)), TrackState::Lost);
    }

    #[test]
    fn full_cycle_with_reacquisition() {
        let mut track = Track::new(TrackingConfig::default().with_max_coast_ms(100));
        assert!(track.needs_reseed());

        assert_eq!(track.observe(0, false), TrackState::Uninitialized);
        assert_eq!(track.observe(20, true), TrackState::Tracking);
        assert!(!track.needs_reseed());
        assert_eq!(track.observe(40, false), TrackState::Coasting);
        assert_eq!(track.observe(120, false), TrackState::Coasting);
        assert_eq!(track.observe(140, false), TrackState::Lost);
        assert!(track.needs_reseed());
        assert_eq!(track.observe(160, true), TrackState::Tracking);
        assert_eq!(track.last_fix_ms(), Some(160));
    }
}
