//! Bundled schema definitions
//!
//! Version 1 of the ranging record and trajectory frame layouts. Each
//! definition keeps the JSON it was parsed from so embedded constraints
//! remain available after parsing.

use apache_avro::Schema;
use serde_json::json;
use uwbtrack_core::constants::{
    physics::FUTSAL_MAX_SPEED_MPS,
    solver::{MAX_VALID_DISTANCE_M, MIN_RSSI_DBM, MIN_VALID_DISTANCE_M},
};

use crate::SchemaError;

/// Namespace shared by the bundled schemas
pub const NAMESPACE: &str = "io.uwbtrack.v1";

/// Parsed schema with its source JSON
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    /// Source JSON including custom properties
    pub json: serde_json::Value,
    /// Parsed Avro schema
    pub schema: Schema,
}

impl SchemaDefinition {
    /// Parse a record schema from JSON
    pub fn parse(json: serde_json::Value) -> Result<Self, SchemaError> {
        let schema = Schema::parse(&json).map_err(|e| SchemaError::ParseError(e.to_string()))?;
        Ok(Self { json, schema })
    }

    /// Namespace declared in the JSON, if any
    pub fn namespace(&self) -> Option<&str> {
        self.json.get("namespace").and_then(|n| n.as_str())
    }
}

/// Ranging record v1: one tag-to-anchor distance
pub fn ranging_record_v1() -> Result<SchemaDefinition, SchemaError> {
    SchemaDefinition::parse(json!({
        "namespace": NAMESPACE,
        "type": "record",
        "name": "RangingRecord",
        "doc": "Single tag-to-anchor range from one ranging cycle",
        "fields": [
            {
                "name": "tag_id",
                "type": "long",
                "uwbtrack.constraints": {"min": 0.0, "max": u32::MAX as f64}
            },
            {
                "name": "device_timestamp_ms",
                "type": "long",
                "doc": "Tag device clock",
                "uwbtrack.constraints": {"unit": "ms", "min": 0.0}
            },
            {
                "name": "system_timestamp_ms",
                "type": "long",
                "doc": "Collector arrival clock",
                "uwbtrack.constraints": {"unit": "ms", "min": 0.0}
            },
            {
                "name": "anchor_id",
                "type": "long",
                "uwbtrack.constraints": {"min": 0.0, "max": u32::MAX as f64}
            },
            {
                "name": "raw_distance_m",
                "type": "double",
                "uwbtrack.constraints": {
                    "unit": "m",
                    "min": MIN_VALID_DISTANCE_M,
                    "max": MAX_VALID_DISTANCE_M
                }
            },
            {
                "name": "filtered_distance_m",
                "type": "double",
                "doc": "Zero when the tag did not filter",
                "uwbtrack.constraints": {"unit": "m", "min": 0.0, "max": MAX_VALID_DISTANCE_M}
            },
            {
                "name": "signal_dbm",
                "type": "double",
                "uwbtrack.constraints": {"unit": "dBm", "max": 0.0, "typical_min": MIN_RSSI_DBM}
            },
            {
                "name": "anchor_status",
                "type": {
                    "type": "enum",
                    "name": "AnchorStatus",
                    "symbols": ["OK", "FAIL"]
                }
            }
        ]
    }))
}

/// Trajectory frame v1: one resampled, smoothed position
pub fn trajectory_frame_v1() -> Result<SchemaDefinition, SchemaError> {
    SchemaDefinition::parse(json!({
        "namespace": NAMESPACE,
        "type": "record",
        "name": "TrajectoryFrame",
        "doc": "Resampled tag position on the output timeline",
        "fields": [
            {
                "name": "timestamp_ms",
                "type": "double",
                "doc": "Fractional on 16.67 ms steps",
                "uwbtrack.constraints": {"unit": "ms", "min": 0.0}
            },
            {
                "name": "x",
                "type": "double",
                "uwbtrack.constraints": {"unit": "m", "max_speed_mps": FUTSAL_MAX_SPEED_MPS}
            },
            {
                "name": "y",
                "type": "double",
                "uwbtrack.constraints": {"unit": "m", "max_speed_mps": FUTSAL_MAX_SPEED_MPS}
            },
            {
                "name": "velocity_x",
                "type": ["null", "double"],
                "default": null,
                "uwbtrack.constraints": {"unit": "m/s"}
            },
            {
                "name": "velocity_y",
                "type": ["null", "double"],
                "default": null,
                "uwbtrack.constraints": {"unit": "m/s"}
            },
            {
                "name": "source",
                "type": {
                    "type": "enum",
                    "name": "FrameSource",
                    "symbols": ["MEASURED", "PREDICTED", "INTERPOLATED"]
                }
            },
            {
                "name": "track_state",
                "type": {
                    "type": "enum",
                    "name": "TrackState",
                    "symbols": ["UNINITIALIZED", "TRACKING", "COASTING", "LOST"]
                }
            },
            {
                "name": "cumulative_distance_m",
                "type": "double",
                "uwbtrack.constraints": {"unit": "m", "min": 0.0}
            }
        ]
    }))
}
