//! Anchor survey files
//!
//! Anchor positions are kept as JSON keyed by anchor id:
//!
//! ```json
//! {
//!   "10": { "position": [0.0, 0.0, 1.5] },
//!   "20": { "position": [40.0, 0.0] }
//! }
//! ```
//!
//! A position without a height gets the store's default anchor height.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uwbtrack_core::{constants::physics::DEFAULT_ANCHOR_HEIGHT_M, AnchorConfig, AnchorMap};

use crate::SchemaError;

#[derive(Debug, Serialize, Deserialize)]
struct AnchorEntry {
    position: Vec<f64>,
}

/// JSON file holding the anchor survey
#[derive(Debug, Clone)]
pub struct AnchorStore {
    path: PathBuf,
    default_height_m: f64,
}

impl AnchorStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_height_m: DEFAULT_ANCHOR_HEIGHT_M,
        }
    }

    /// Height given to anchors saved without one
    pub fn with_default_height(mut self, height_m: f64) -> Self {
        self.default_height_m = height_m;
        self
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the survey
    pub fn load(&self) -> Result<AnchorMap, SchemaError> {
        let text = fs::read_to_string(&self.path)?;
        parse_anchors(&text, self.default_height_m)
    }

    /// Read the survey, or an empty map when the file does not exist yet
    pub fn load_or_default(&self) -> Result<AnchorMap, SchemaError> {
        if self.path.exists() {
            self.load()
        } else {
            Ok(AnchorMap::new())
        }
    }

    /// Write the survey, replacing the file
    pub fn save(&self, anchors: &AnchorMap) -> Result<(), SchemaError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = anchors_to_json(anchors, self.default_height_m)?;
        fs::write(&self.path, text)?;
        log::debug!("saved {} anchors to {}", anchors.len(), self.path.display());
        Ok(())
    }
}

/// Parse survey JSON
pub fn parse_anchors(text: &str, default_height_m: f64) -> Result<AnchorMap, SchemaError> {
    let entries: BTreeMap<String, AnchorEntry> = serde_json::from_str(text)?;
    let mut anchors = AnchorMap::new();

    for (key, entry) in entries {
        let anchor_id = key
            .trim()
            .parse()
            .map_err(|_| SchemaError::InvalidRecord(format!("anchor id {key:?} is not a number")))?;
        let (x, y, z) = match entry.position.as_slice() {
            [x, y] => (*x, *y, default_height_m),
            [x, y, z] => (*x, *y, *z),
            other => {
                return Err(SchemaError::InvalidRecord(format!(
                    "anchor {key} has {} coordinates, expected 2 or 3",
                    other.len()
                )))
            }
        };
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(SchemaError::InvalidRecord(format!("anchor {key} has a non-finite position")));
        }
        if anchors.insert(AnchorConfig::new(anchor_id, x, y).with_height(z)).is_some() {
            log::warn!("anchor {} listed twice, keeping the last entry", anchor_id);
        }
    }
    Ok(anchors)
}

/// Survey JSON for `anchors`, with missing heights filled in
pub fn anchors_to_json(anchors: &AnchorMap, default_height_m: f64) -> Result<String, SchemaError> {
    let entries: BTreeMap<String, AnchorEntry> = anchors
        .iter()
        .map(|anchor| {
            let z = anchor.z.unwrap_or(default_height_m);
            (
                anchor.anchor_id.to_string(),
                AnchorEntry {
                    position: vec![anchor.position.x, anchor.position.y, z],
                },
            )
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
