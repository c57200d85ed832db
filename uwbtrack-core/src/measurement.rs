//! Ranging measurements
//!
//! One `RangeMeasurement` is one tag-to-anchor distance from one ranging
//! cycle. Records are consumed once by the windowing stage and never
//! retained.
//!
//! ## Wire Format
//!
//! Collectors deliver records as comma-separated text:
//!
//! ```text
//! tag_id,device_timestamp_ms,anchor_id,raw_distance_m,filtered_distance_m,signal_dbm,anchor_status
//! 1,123456,10,3.412,3.398,-78.5,1
//! ```
//!
//! `anchor_status` is `1` when the anchor answered; any other code is FAIL.
//! The arrival time is not on the wire and is supplied by the collector.

use crate::{
    constants::solver::{MAX_VALID_DISTANCE_M, MIN_VALID_DISTANCE_M},
    errors::{TrackError, TrackResult},
    time::{ClockSource, Timestamp},
};

/// Tag identifier
pub type TagId = u32;

/// Anchor identifier
pub type AnchorId = u32;

/// Number of comma-separated fields in a ranging record
pub const RECORD_FIELD_COUNT: usize = 7;

/// Anchor health reported with each range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorStatus {
    /// Anchor answered the ranging exchange
    Ok,
    /// Anchor did not answer; the distance is meaningless
    Fail,
}

impl AnchorStatus {
    /// Decode the wire status code
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            Self::Ok
        } else {
            Self::Fail
        }
    }

    /// Wire status code
    pub fn code(&self) -> i64 {
        match self {
            Self::Ok => 1,
            Self::Fail => 0,
        }
    }
}

/// Single tag-to-anchor range
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeMeasurement {
    /// Tag that ranged
    pub tag_id: TagId,
    /// Tag device clock (ms)
    pub device_timestamp_ms: Timestamp,
    /// Collector arrival clock (ms)
    pub system_timestamp_ms: Timestamp,
    /// Anchor ranged against
    pub anchor_id: AnchorId,
    /// Unfiltered distance reported by the tag (m)
    pub raw_distance_m: f64,
    /// Distance after the tag's on-board filter (m), 0 when unavailable
    pub filtered_distance_m: f64,
    /// Received signal power (dBm)
    pub signal_dbm: f64,
    /// Anchor health
    pub status: AnchorStatus,
}

impl RangeMeasurement {
    /// Create an OK range where raw and filtered distances agree
    pub fn new(tag_id: TagId, timestamp_ms: Timestamp, anchor_id: AnchorId, distance_m: f64) -> Self {
        Self {
            tag_id,
            device_timestamp_ms: timestamp_ms,
            system_timestamp_ms: timestamp_ms,
            anchor_id,
            raw_distance_m: distance_m,
            filtered_distance_m: distance_m,
            signal_dbm: -70.0,
            status: AnchorStatus::Ok,
        }
    }

    /// Set the anchor status
    pub fn with_status(mut self, status: AnchorStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the signal power
    pub fn with_signal(mut self, signal_dbm: f64) -> Self {
        self.signal_dbm = signal_dbm;
        self
    }

    /// Distance used for solving: filtered when present, raw otherwise
    pub fn distance_m(&self) -> f64 {
        if self.filtered_distance_m > 0.0 && self.filtered_distance_m.is_finite() {
            self.filtered_distance_m
        } else {
            self.raw_distance_m
        }
    }

    /// Timestamp on the selected clock
    pub fn timestamp(&self, clock: ClockSource) -> Timestamp {
        match clock {
            ClockSource::Device => self.device_timestamp_ms,
            ClockSource::System => self.system_timestamp_ms,
        }
    }

    /// Whether this range may contribute to a fix
    ///
    /// Requires status OK, a finite distance inside the plausible range,
    /// and a signal at least `min_signal_dbm` strong.
    pub fn is_valid(&self, min_signal_dbm: f64) -> bool {
        let distance = self.distance_m();
        self.status == AnchorStatus::Ok
            && distance.is_finite()
            && distance > MIN_VALID_DISTANCE_M
            && distance <= MAX_VALID_DISTANCE_M
            && !(self.signal_dbm < min_signal_dbm)
    }

    /// Parse a collector record
    ///
    /// `system_timestamp_ms` is the arrival time assigned by the caller.
    pub fn parse_record(line: &str, system_timestamp_ms: Timestamp) -> TrackResult<Self> {
        let mut fields: [&str; RECORD_FIELD_COUNT] = [""; RECORD_FIELD_COUNT];
        let mut count = 0;
        for field in line.trim().split(',') {
            if count == RECORD_FIELD_COUNT {
                return Err(TrackError::MalformedInput { reason: "too many fields" });
            }
            fields[count] = field.trim();
            count += 1;
        }
        if count != RECORD_FIELD_COUNT {
            return Err(TrackError::MalformedInput { reason: "too few fields" });
        }

        let tag_id = fields[0]
            .parse::<TagId>()
            .map_err(|_| TrackError::MalformedInput { reason: "tag id" })?;
        let device_timestamp_ms = fields[1]
            .parse::<Timestamp>()
            .map_err(|_| TrackError::MalformedInput { reason: "device timestamp" })?;
        let anchor_id = fields[2]
            .parse::<AnchorId>()
            .map_err(|_| TrackError::MalformedInput { reason: "anchor id" })?;
        let raw_distance_m = parse_distance(fields[3], "raw distance")?;
        let filtered_distance_m = parse_distance(fields[4], "filtered distance")?;
        let signal_dbm = fields[5]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(TrackError::MalformedInput { reason: "signal power" })?;
        let status_code = fields[6]
            .parse::<i64>()
            .map_err(|_| TrackError::MalformedInput { reason: "anchor status" })?;

        Ok(Self {
            tag_id,
            device_timestamp_ms,
            system_timestamp_ms,
            anchor_id,
            raw_distance_m,
            filtered_distance_m,
            signal_dbm,
            status: AnchorStatus::from_code(status_code),
        })
    }
}

fn parse_distance(field: &str, reason: &'static str) -> TrackResult<f64> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(TrackError::MalformedInput { reason }),
    }
}
