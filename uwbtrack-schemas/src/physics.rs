//! Motion Constraints Embedded in Schemas
//!
//! Every field of the bundled schemas may carry a `uwbtrack.constraints`
//! object. Hard limits (`min`, `max`, `max_speed_mps`) make a record
//! invalid; typical limits only raise warnings.
//!
//! The constraints are read from the schema JSON rather than the parsed
//! Avro schema, so custom properties survive regardless of how the Avro
//! parser treats unknown attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema property holding a field's constraints
pub const CONSTRAINTS_PROPERTY_KEY: &str = "uwbtrack.constraints";

/// Physical limits of one record field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConstraints {
    /// Unit of the stored value (SI where possible)
    pub unit: Option<String>,

    /// Hard lower limit
    pub min: Option<f64>,

    /// Hard upper limit
    pub max: Option<f64>,

    /// Below this the value is unusual but possible
    pub typical_min: Option<f64>,

    /// Above this the value is unusual but possible
    pub typical_max: Option<f64>,

    /// Position change limit between consecutive records (m/s)
    pub max_speed_mps: Option<f64>,
}

impl FieldConstraints {
    /// Constraints with only a unit
    pub fn unit(unit: &str) -> Self {
        Self {
            unit: Some(unit.to_string()),
            ..Self::default()
        }
    }

    /// Set the hard range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Set the speed limit
    pub fn with_max_speed(mut self, max_speed_mps: f64) -> Self {
        self.max_speed_mps = Some(max_speed_mps);
        self
    }

    /// Whether `value` lies inside the hard limits
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite()
            && self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
    }

    /// Whether `value` lies inside the typical limits
    pub fn is_typical(&self, value: f64) -> bool {
        self.typical_min.map_or(true, |min| value >= min) && self.typical_max.map_or(true, |max| value <= max)
    }

    /// Unit label for messages
    pub fn display_unit(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }
}

/// Per-field constraints of a record schema, keyed by field name
///
/// Fields without the property are absent. Malformed properties are
/// skipped with a warning.
pub fn extract_from_schema(schema_json: &serde_json::Value) -> BTreeMap<String, FieldConstraints> {
    let mut constraints = BTreeMap::new();
    let Some(fields) = schema_json.get("fields").and_then(|f| f.as_array()) else {
        return constraints;
    };

    for field in fields {
        let (Some(name), Some(property)) = (
            field.get("name").and_then(|n| n.as_str()),
            field.get(CONSTRAINTS_PROPERTY_KEY),
        ) else {
            continue;
        };
        match serde_json::from_value::<FieldConstraints>(property.clone()) {
            Ok(parsed) => {
                constraints.insert(name.to_string(), parsed);
            }
            Err(err) => log::warn!("ignoring constraints on field {}: {}", name, err),
        }
    }
    constraints
}

/// Field names declared by a record schema, in declaration order
pub fn field_names(schema_json: &serde_json::Value) -> Vec<String> {
    schema_json
        .get("fields")
        .and_then(|f| f.as_array())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("name").and_then(|n| n.as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Embed constraints into a field of the schema JSON
///
/// Returns `false` when the schema has no field of that name.
pub fn embed_in_schema(schema_json: &mut serde_json::Value, field: &str, constraints: &FieldConstraints) -> bool {
    let Some(fields) = schema_json.get_mut("fields").and_then(|f| f.as_array_mut()) else {
        return false;
    };
    let Some(target) = fields
        .iter_mut()
        .find(|f| f.get("name").and_then(|n| n.as_str()) == Some(field))
    else {
        return false;
    };
    let (Some(object), Ok(value)) = (target.as_object_mut(), serde_json::to_value(constraints)) else {
        return false;
    };
    object.insert(CONSTRAINTS_PROPERTY_KEY.to_string(), value);
    true
}
