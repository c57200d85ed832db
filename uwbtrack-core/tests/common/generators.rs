//! Synthetic UWB ranging generators
//!
//! Produces ranging records the way a real collector delivers them: one
//! record per anchor per ranging cycle, anchors answering a millisecond
//! apart, with a configurable noise model:
//! - Gaussian range noise
//! - Per-record dropouts
//! - Occasional multipath outliers (ranges that are far too long)

use uwbtrack_core::{AnchorMap, AnchorStatus, Point2, RangeMeasurement, TagId, Timestamp};

use super::harness::TestRng;

/// Ranging error model
#[derive(Debug, Clone, Copy)]
pub struct RangeNoise {
    /// Standard deviation of range noise (m)
    pub sigma_m: f64,
    /// Probability that a record is missing
    pub dropout: f64,
    /// Probability that a record is a multipath outlier
    pub outlier_probability: f64,
    /// Extra path length of an outlier (m)
    pub outlier_m: f64,
}

impl RangeNoise {
    /// Perfect ranging
    pub fn exact() -> Self {
        Self {
            sigma_m: 0.0,
            dropout: 0.0,
            outlier_probability: 0.0,
            outlier_m: 0.0,
        }
    }

    /// Typical indoor UWB: 5 cm noise, rare dropouts
    pub fn typical() -> Self {
        Self {
            sigma_m: 0.05,
            dropout: 0.02,
            outlier_probability: 0.0,
            outlier_m: 0.0,
        }
    }

    /// Cluttered hall with multipath
    pub fn multipath() -> Self {
        Self {
            sigma_m: 0.08,
            dropout: 0.05,
            outlier_probability: 0.03,
            outlier_m: 2.5,
        }
    }
}

/// Generates ranging records for one tag
pub struct RangingGenerator {
    tag_id: TagId,
    anchors: AnchorMap,
    cycle_ms: Timestamp,
    noise: RangeNoise,
    rng: TestRng,
}

impl RangingGenerator {
    pub fn new(tag_id: TagId, anchors: AnchorMap, cycle_ms: Timestamp) -> Self {
        Self {
            tag_id,
            anchors,
            cycle_ms,
            noise: RangeNoise::exact(),
            rng: TestRng::new(42),
        }
    }

    pub fn with_noise(mut self, noise: RangeNoise) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = TestRng::new(seed);
        self
    }

    pub fn cycle_ms(&self) -> Timestamp {
        self.cycle_ms
    }

    /// One ranging cycle at `timestamp_ms` for a tag at `position`
    pub fn cycle(&mut self, timestamp_ms: Timestamp, position: Point2) -> Vec<RangeMeasurement> {
        let mut records = Vec::new();
        for (index, anchor) in self.anchors.iter().enumerate() {
            if self.rng.chance(self.noise.dropout) {
                continue;
            }
            let mut distance = anchor.position.distance_to(&position) + self.rng.gaussian(self.noise.sigma_m);
            if self.rng.chance(self.noise.outlier_probability) {
                distance += self.noise.outlier_m;
            }
            records.push(
                RangeMeasurement::new(self.tag_id, timestamp_ms + index as Timestamp, anchor.anchor_id, distance.max(0.01))
                    .with_signal(-70.0 - self.rng.gen_range(0.0, 10.0)),
            );
        }
        records
    }

    /// A cycle in which only the first `answering` anchors respond
    pub fn partial_cycle(&mut self, timestamp_ms: Timestamp, position: Point2, answering: usize) -> Vec<RangeMeasurement> {
        let mut records = self.cycle(timestamp_ms, position);
        records.truncate(answering);
        records
    }

    /// A cycle in which every anchor reports failure
    pub fn failed_cycle(&mut self, timestamp_ms: Timestamp) -> Vec<RangeMeasurement> {
        self.anchors
            .iter()
            .enumerate()
            .map(|(index, anchor)| {
                RangeMeasurement::new(self.tag_id, timestamp_ms + index as Timestamp, anchor.anchor_id, 0.0)
                    .with_status(AnchorStatus::Fail)
            })
            .collect()
    }

    /// Records for every cycle in `[start_ms, end_ms)` along `path(t_s)`
    pub fn along<P>(&mut self, path: P, start_ms: Timestamp, end_ms: Timestamp) -> Vec<RangeMeasurement>
    where
        P: Fn(f64) -> Point2,
    {
        let mut records = Vec::new();
        let mut timestamp = start_ms;
        while timestamp < end_ms {
            let position = path(timestamp as f64 / 1000.0);
            records.extend(self.cycle(timestamp, position));
            timestamp += self.cycle_ms;
        }
        records
    }
}

/// Straight line at constant velocity
pub fn straight_line(start: Point2, velocity: Point2) -> impl Fn(f64) -> Point2 {
    move |t| start + velocity * t
}

/// Circle around `center`, one lap every `period_s` seconds
pub fn circle(center: Point2, radius_m: f64, period_s: f64) -> impl Fn(f64) -> Point2 {
    move |t| {
        let angle = 2.0 * std::f64::consts::PI * t / period_s;
        Point2::new(center.x + radius_m * angle.cos(), center.y + radius_m * angle.sin())
    }
}

/// Shuttle run between two points at constant speed, turning sharply
pub fn shuttle(a: Point2, b: Point2, speed_mps: f64) -> impl Fn(f64) -> Point2 {
    let leg_s = a.distance_to(&b) / speed_mps;
    move |t| {
        let phase = (t / leg_s) % 2.0;
        let fraction = if phase <= 1.0 { phase } else { 2.0 - phase };
        a + (b - a) * fraction
    }
}
