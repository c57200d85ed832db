//! Avro Schemas with Embedded Motion Constraints
//!
//! ## Overview
//!
//! Ranging records and trajectory frames leave the tracker as Avro records.
//! Each field of the bundled schemas carries a `uwbtrack.constraints`
//! property describing its unit and physical range, so any consumer of the
//! data can check it against the same limits the tracker used.
//!
//! ```json
//! {
//!   "name": "raw_distance_m",
//!   "type": "double",
//!   "uwbtrack.constraints": { "unit": "m", "min": 0.01, "max": 200.0 }
//! }
//! ```
//!
//! Trajectory position fields also carry `max_speed_mps`, which the
//! [`RecordValidator`] applies between consecutive frames.
//!
//! ## Schema Evolution
//!
//! 1. **Always Append**: new fields are added with defaults, never removed
//! 2. **Version in Name**: `ranging_record_v1`, `ranging_record_v2`
//! 3. **Registry**: [`SchemaRegistry`] tracks versions and the latest one
//!
//! ## Deployment Files
//!
//! - [`AnchorStore`] reads and writes the anchor survey as JSON
//!   (`{"10": {"position": [0.0, 0.0, 1.5]}}`)
//! - [`SportProfile`] turns a sport context into area bounds and motion limits
//!
//! ## Usage Example
//!
//! ```rust
//! use uwbtrack_core::RangeMeasurement;
//! use uwbtrack_schemas::{AvroRecord, RecordValidator, GLOBAL_REGISTRY};
//!
//! let schema = GLOBAL_REGISTRY.get_latest("ranging_record")?;
//! let record = RangeMeasurement::new(1, 1_000, 10, 3.2).to_avro_value();
//! assert!(record.validate(&schema));
//!
//! let report = RecordValidator::ranging()?.validate(&record);
//! assert!(report.is_valid());
//! # Ok::<(), uwbtrack_schemas::SchemaError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod anchors;
pub mod convert;
pub mod physics;
pub mod profile;
pub mod registry;
pub mod schemas;
pub mod validation;

pub use anchors::AnchorStore;
pub use convert::{decode_datum, encode_datum, from_avro_value, to_avro_value, AvroRecord};
pub use physics::{FieldConstraints, CONSTRAINTS_PROPERTY_KEY};
pub use profile::SportProfile;
pub use registry::{SchemaMetadata, SchemaRegistry, GLOBAL_REGISTRY};
pub use schemas::SchemaDefinition;
pub use validation::{IssueType, RecordValidator, Severity, ValidationIssue, ValidationReport};

/// Schema-related errors
#[derive(Debug, thiserror_no_std::Error)]
pub enum SchemaError {
    /// Schema JSON did not parse
    #[error("Failed to parse schema: {0}")]
    ParseError(String),

    /// No schema registered under the name
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// Schema rejected at registration
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Avro value does not match the expected record layout
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Avro or JSON encoding failed
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    /// File access failed
    #[error("I/O error: {0}")]
    Io(String),

    /// A registry lock was poisoned by a panicking writer
    #[error("Registry lock poisoned")]
    LockPoisoned,
}

impl From<std::io::Error> for SchemaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<apache_avro::Error> for SchemaError {
    fn from(err: apache_avro::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
