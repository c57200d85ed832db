//! Motion context from recent history
//!
//! Predictions should not exceed what the player has actually been doing.
//! Outside a sprint the speed cap follows the recent average speed with a
//! margin; during a sprint the full sport limit applies.

use uwbtrack_core::{
    constants::physics::{AVERAGE_SPEED_MARGIN, DEFAULT_AVERAGE_SPEED_MPS, SPRINT_THRESHOLD_MPS},
    constants::MS_PER_SECOND,
    Point2,
};

/// Sprint detection and speed-cap settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionConfig {
    /// Recent speed above which the player is sprinting (m/s)
    pub sprint_threshold_mps: f64,
    /// Average speed assumed without history (m/s)
    pub default_average_speed_mps: f64,
    /// Factor on the average speed when not sprinting
    pub average_speed_margin: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sprint_threshold_mps: SPRINT_THRESHOLD_MPS,
            default_average_speed_mps: DEFAULT_AVERAGE_SPEED_MPS,
            average_speed_margin: AVERAGE_SPEED_MARGIN,
        }
    }
}

/// Speeds derived from a window of timestamped positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionContext {
    /// Speed over the most recent segment (m/s)
    pub recent_speed_mps: f64,
    /// Path length over elapsed time across the window (m/s)
    pub average_speed_mps: f64,
    /// Whether the recent speed exceeds the sprint threshold
    pub sprinting: bool,
}

impl MotionContext {
    /// Context for `(timestamp_ms, position)` pairs in time order
    pub fn from_history<'a, I>(config: &MotionConfig, history: I) -> Self
    where
        I: IntoIterator<Item = &'a (f64, Point2)>,
    {
        let mut previous: Option<(f64, Point2)> = None;
        let mut distance = 0.0;
        let mut elapsed_ms = 0.0;
        let mut recent = None;

        for &(ts, position) in history {
            if let Some((prev_ts, prev_position)) = previous {
                let dt = ts - prev_ts;
                if dt > 0.0 {
                    let step = position.distance_to(&prev_position);
                    distance += step;
                    elapsed_ms += dt;
                    recent = Some(step / dt * MS_PER_SECOND);
                }
            }
            previous = Some((ts, position));
        }

        let average_speed_mps = if elapsed_ms > 0.0 {
            distance / elapsed_ms * MS_PER_SECOND
        } else {
            config.default_average_speed_mps
        };
        let recent_speed_mps = recent.unwrap_or(average_speed_mps);

        Self {
            recent_speed_mps,
            average_speed_mps,
            sprinting: recent_speed_mps > config.sprint_threshold_mps,
        }
    }

    /// Speed ceiling for predictions, never above `max_speed_mps`
    pub fn speed_cap(&self, config: &MotionConfig, max_speed_mps: f64) -> f64 {
        if self.sprinting {
            max_speed_mps
        } else {
            max_speed_mps.min(config.average_speed_margin * self.average_speed_mps)
        }
    }
}
