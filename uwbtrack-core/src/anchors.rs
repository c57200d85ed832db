//! Anchor configuration
//!
//! Anchors are loaded at startup and read by every tag session. Writers
//! (configuration tooling) are rare and never concurrent with solving, so
//! the map is shared behind a read-mostly lock in `std` builds.

use alloc::collections::BTreeMap;

use crate::{
    constants::physics::DEFAULT_ANCHOR_HEIGHT_M,
    geometry::Point2,
    measurement::AnchorId,
};

/// Fixed reference node with a known position
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchorConfig {
    /// Anchor identifier as reported in ranging records
    pub anchor_id: AnchorId,
    /// Floor-plane position (m)
    pub position: Point2,
    /// Mounting height (m), if surveyed
    pub z: Option<f64>,
}

impl AnchorConfig {
    /// Anchor with a floor-plane position only
    pub fn new(anchor_id: AnchorId, x: f64, y: f64) -> Self {
        Self {
            anchor_id,
            position: Point2::new(x, y),
            z: None,
        }
    }

    /// Anchor with a surveyed mounting height
    pub fn with_height(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }
}

/// Anchor positions keyed by anchor id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorMap {
    anchors: BTreeMap<AnchorId, AnchorConfig>,
}

impl AnchorMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an anchor
    pub fn insert(&mut self, anchor: AnchorConfig) -> Option<AnchorConfig> {
        self.anchors.insert(anchor.anchor_id, anchor)
    }

    /// Remove an anchor
    pub fn remove(&mut self, anchor_id: AnchorId) -> Option<AnchorConfig> {
        self.anchors.remove(&anchor_id)
    }

    /// Look up an anchor
    pub fn get(&self, anchor_id: AnchorId) -> Option<&AnchorConfig> {
        self.anchors.get(&anchor_id)
    }

    /// Number of anchors
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the map holds no anchors
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in id order
    pub fn iter(&self) -> impl Iterator<Item = &AnchorConfig> {
        self.anchors.values()
    }

    /// Four-anchor layout of the 6.26 m x 6.6 m indoor test court
    pub fn test_court() -> Self {
        [
            AnchorConfig::new(10, 0.0, 2.0),
            AnchorConfig::new(20, 0.0, 6.66),
            AnchorConfig::new(30, 6.25, 0.1),
            AnchorConfig::new(40, 6.25, 3.0),
        ]
        .into_iter()
        .map(|a| a.with_height(DEFAULT_ANCHOR_HEIGHT_M))
        .collect()
    }
}

impl FromIterator<AnchorConfig> for AnchorMap {
    fn from_iter<I: IntoIterator<Item = AnchorConfig>>(iter: I) -> Self {
        let mut map = AnchorMap::new();
        for anchor in iter {
            map.insert(anchor);
        }
        map
    }
}

/// Anchor map shared read-mostly across tag sessions
#[cfg(feature = "std")]
pub type SharedAnchors = std::sync::Arc<std::sync::RwLock<AnchorMap>>;

/// Wrap a map for sharing across sessions
#[cfg(feature = "std")]
pub fn share(map: AnchorMap) -> SharedAnchors {
    std::sync::Arc::new(std::sync::RwLock::new(map))
}
