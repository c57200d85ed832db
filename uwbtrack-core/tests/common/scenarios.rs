//! Pre-built tracking scenarios with ground truth
//!
//! Each scenario covers one situation the pipeline must survive:
//! - Clean and noisy continuous motion
//! - Short windows with too few anchors (Unknown fixes)
//! - A complete blackout long enough to lose the track
//! - A single ranging cycle displaced by several metres

use uwbtrack_core::{AnchorMap, Bounds, Point2, RangeMeasurement, Timestamp};

use super::generators::{circle, straight_line, RangeNoise, RangingGenerator};
use super::{square_bounds, square_field};

/// Tag used by every scenario
pub const SCENARIO_TAG: u32 = 7;

/// Ranging records plus the path that produced them
pub struct TestScenario {
    pub name: &'static str,
    pub anchors: AnchorMap,
    pub bounds: Bounds,
    pub records: Vec<RangeMeasurement>,
    path: Box<dyn Fn(f64) -> Point2>,
}

impl TestScenario {
    /// True position at `timestamp_ms`
    pub fn truth(&self, timestamp_ms: f64) -> Point2 {
        (self.path)(timestamp_ms / 1000.0)
    }

    /// Timestamp of the last record
    pub fn end_ms(&self) -> Timestamp {
        self.records.last().map_or(0, |r| r.device_timestamp_ms)
    }
}

/// Pre-built scenario definitions
pub struct Scenarios;

impl Scenarios {
    /// Four seconds of walking diagonally with typical ranging noise
    pub fn straight_run() -> TestScenario {
        let path = straight_line(Point2::new(2.0, 2.0), Point2::new(1.0, 0.5));
        let mut generator = RangingGenerator::new(SCENARIO_TAG, square_field(), 50).with_noise(RangeNoise::typical());
        let records = generator.along(&path, 0, 4000);
        TestScenario {
            name: "straight_run",
            anchors: square_field(),
            bounds: square_bounds(),
            records,
            path: Box::new(path),
        }
    }

    /// Jogging laps with multipath outliers and dropouts
    pub fn multipath_laps() -> TestScenario {
        let path = circle(Point2::new(5.0, 5.0), 3.0, 8.0);
        let mut generator = RangingGenerator::new(SCENARIO_TAG, square_field(), 50)
            .with_noise(RangeNoise::multipath())
            .with_seed(7);
        let records = generator.along(&path, 0, 8000);
        TestScenario {
            name: "multipath_laps",
            anchors: square_field(),
            bounds: square_bounds(),
            records,
            path: Box::new(path),
        }
    }

    /// Exact ranging with three cycles where only two anchors answer
    pub fn unknown_windows() -> TestScenario {
        let path = straight_line(Point2::new(1.0, 5.0), Point2::new(1.0, 0.0));
        let mut generator = RangingGenerator::new(SCENARIO_TAG, square_field(), 50);
        let mut records = Vec::new();
        for cycle in 0..60u64 {
            let ts = cycle * 50;
            let position = path(ts as f64 / 1000.0);
            if (20..23).contains(&cycle) {
                records.extend(generator.partial_cycle(ts, position, 2));
            } else {
                records.extend(generator.cycle(ts, position));
            }
        }
        TestScenario {
            name: "unknown_windows",
            anchors: square_field(),
            bounds: square_bounds(),
            records,
            path: Box::new(path),
        }
    }

    /// Ranging stops for 1.5 s, long enough to lose the track
    pub fn blackout() -> TestScenario {
        let path = straight_line(Point2::new(2.0, 3.0), Point2::new(0.8, 0.4));
        let mut generator = RangingGenerator::new(SCENARIO_TAG, square_field(), 50);
        let mut records = generator.along(&path, 0, 1000);
        records.extend(generator.along(&path, 2500, 4000));
        TestScenario {
            name: "blackout",
            anchors: square_field(),
            bounds: square_bounds(),
            records,
            path: Box::new(path),
        }
    }

    /// Exact ranging with one cycle measured 5 m off the path
    pub fn displaced_cycle() -> TestScenario {
        let path = straight_line(Point2::new(2.0, 2.0), Point2::new(1.0, 0.0));
        let mut generator = RangingGenerator::new(SCENARIO_TAG, square_field(), 50);
        let mut records = Vec::new();
        for cycle in 0..40u64 {
            let ts = cycle * 50;
            let mut position = path(ts as f64 / 1000.0);
            if cycle == 20 {
                position = position + Point2::new(0.0, 5.0);
            }
            records.extend(generator.cycle(ts, position));
        }
        TestScenario {
            name: "displaced_cycle",
            anchors: square_field(),
            bounds: square_bounds(),
            records,
            path: Box::new(path),
        }
    }

    pub fn all() -> Vec<TestScenario> {
        vec![
            Self::straight_run(),
            Self::multipath_laps(),
            Self::unknown_windows(),
            Self::blackout(),
            Self::displaced_cycle(),
        ]
    }
}
