//! Assertion helpers and deterministic randomness

/// Assert `|actual - expected| <= tolerance`
#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let diff = ($actual - $expected).abs();
        if diff > $tolerance {
            panic!(
                "Value {} not within tolerance {} of expected {} (diff: {})",
                $actual, $tolerance, $expected, diff
            );
        }
    };
}

/// Assert two points are at most `tolerance` metres apart
#[macro_export]
macro_rules! assert_point_near {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let distance = $actual.distance_to(&$expected);
        if distance > $tolerance {
            panic!(
                "Point {:?} not within {} m of {:?} (off by {:.4} m)",
                $actual, $tolerance, $expected, distance
            );
        }
    };
}

/// Assert consecutive frames never imply a speed above `max_speed` (m/s)
#[macro_export]
macro_rules! assert_speed_bounded {
    ($frames:expr, $max_speed:expr) => {
        for pair in $frames.windows(2) {
            let dt_s = (pair[1].timestamp_ms - pair[0].timestamp_ms) / 1000.0;
            let speed = pair[1].position.distance_to(&pair[0].position) / dt_s;
            if speed > $max_speed + 1e-6 {
                panic!(
                    "Implausible speed {:.2} m/s between {} ms and {} ms",
                    speed, pair[0].timestamp_ms, pair[1].timestamp_ms
                );
            }
        }
    };
}

/// Deterministic random number generator for tests
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u32() >> 8) as f64 / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Approximately normal sample (Irwin-Hall with 12 uniforms)
    pub fn gaussian(&mut self, sigma: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.next_f64()).sum();
        (sum - 6.0) * sigma
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}
