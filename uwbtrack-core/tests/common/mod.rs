//! Common test utilities for integration tests
//!
//! This module provides:
//! - Anchor layouts and exact synthetic ranging
//! - Noisy ranging generators along scripted paths
//! - Pre-built tracking scenarios with ground truth
//! - Assertion helpers and a deterministic RNG

#![allow(dead_code)]

use uwbtrack_core::{
    AnchorConfig, AnchorMap, Bounds, Point2, RangeMeasurement, TagId, Timestamp,
};

pub mod generators;
pub mod harness;
pub mod scenarios;

/// Side length of the square test field (m)
pub const FIELD_SIZE_M: f64 = 10.0;

/// Four anchors in the corners of the square test field
pub fn square_field() -> AnchorMap {
    [
        AnchorConfig::new(1, 0.0, 0.0),
        AnchorConfig::new(2, FIELD_SIZE_M, 0.0),
        AnchorConfig::new(3, 0.0, FIELD_SIZE_M),
        AnchorConfig::new(4, FIELD_SIZE_M, FIELD_SIZE_M),
    ]
    .into_iter()
    .collect()
}

/// Bounds of the square test field
pub fn square_bounds() -> Bounds {
    Bounds::from_size(FIELD_SIZE_M, FIELD_SIZE_M)
}

/// Exact ranges from every anchor to `position`
pub fn exact_ranges(tag_id: TagId, timestamp_ms: Timestamp, position: Point2, anchors: &AnchorMap) -> Vec<RangeMeasurement> {
    anchors
        .iter()
        .map(|a| RangeMeasurement::new(tag_id, timestamp_ms, a.anchor_id, a.position.distance_to(&position)))
        .collect()
}
