//! Schema-Based Validation
//!
//! Checks Avro records against a schema's structure and the motion
//! constraints embedded in it. Single records are checked for missing
//! fields, type conformance and hard or typical ranges; sequences of
//! trajectory frames are additionally checked for implied speed and
//! timestamp order.

use std::collections::BTreeMap;

use apache_avro::{types::Value, Schema};
use uwbtrack_core::constants::MS_PER_SECOND;

use crate::{
    convert::{as_number, lookup, record_fields},
    physics::{self, FieldConstraints},
    registry::SchemaRegistry,
    schemas::{self, SchemaDefinition},
    SchemaError,
};

/// Validator for records of one schema
#[derive(Debug, Clone)]
pub struct RecordValidator {
    schema: Schema,
    fields: Vec<String>,
    constraints: BTreeMap<String, FieldConstraints>,
}

impl RecordValidator {
    /// Validator using the constraints embedded in the definition
    pub fn new(definition: &SchemaDefinition) -> Self {
        Self {
            schema: definition.schema.clone(),
            fields: physics::field_names(&definition.json),
            constraints: physics::extract_from_schema(&definition.json),
        }
    }

    /// Validator for the bundled ranging record schema
    pub fn ranging() -> Result<Self, SchemaError> {
        Ok(Self::new(&schemas::ranging_record_v1()?))
    }

    /// Validator for the bundled trajectory frame schema
    pub fn trajectory() -> Result<Self, SchemaError> {
        Ok(Self::new(&schemas::trajectory_frame_v1()?))
    }

    /// Validator for the latest registered version of `base_name`
    pub fn from_registry(registry: &SchemaRegistry, base_name: &str) -> Result<Self, SchemaError> {
        let qualified = registry.latest_name(base_name)?;
        Ok(Self::new(&registry.get_definition(&qualified)?))
    }

    /// Replace the constraints of one field
    pub fn with_constraints(mut self, field: &str, constraints: FieldConstraints) -> Self {
        self.constraints.insert(field.to_string(), constraints);
        self
    }

    /// Constraints in effect for `field`
    pub fn constraints(&self, field: &str) -> Option<&FieldConstraints> {
        self.constraints.get(field)
    }

    /// Validate one record
    pub fn validate(&self, value: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.validate_structure(value, &mut report);
        if let Ok(fields) = record_fields(value) {
            self.validate_physics(fields, &mut report);
        }
        report
    }

    /// Validate trajectory frames in timeline order
    ///
    /// Every frame is validated on its own; consecutive frames must have
    /// increasing timestamps and must not move faster than the position
    /// fields' `max_speed_mps`.
    pub fn validate_sequence(&self, values: &[Value]) -> ValidationReport {
        let mut report = ValidationReport::new();
        let max_speed = ["x", "y"]
            .iter()
            .filter_map(|f| self.constraints.get(*f).and_then(|c| c.max_speed_mps))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));

        let mut previous: Option<(f64, f64, f64)> = None;
        for (index, value) in values.iter().enumerate() {
            report.merge(self.validate(value));

            let Some(current) = record_fields(value).ok().and_then(frame_point) else {
                continue;
            };
            if let Some((prev_ts, prev_x, prev_y)) = previous {
                let (ts, x, y) = current;
                let dt_ms = ts - prev_ts;
                if dt_ms <= 0.0 {
                    report.add_error(ValidationIssue {
                        issue_type: IssueType::OrderViolation,
                        field: Some("timestamp_ms".to_string()),
                        message: format!("Frame {} at {} ms does not follow {} ms", index, ts, prev_ts),
                        severity: Severity::Error,
                    });
                } else if let Some(limit) = max_speed {
                    let speed = (x - prev_x).hypot(y - prev_y) / dt_ms * MS_PER_SECOND;
                    if speed > limit + SPEED_TOLERANCE_MPS {
                        report.add_error(ValidationIssue {
                            issue_type: IssueType::RateViolation,
                            field: Some("x".to_string()),
                            message: format!("Frame {} moves at {:.2} m/s, limit {:.2} m/s", index, speed, limit),
                            severity: Severity::Error,
                        });
                    }
                }
            }
            previous = Some(current);
        }
        report
    }

    fn validate_structure(&self, value: &Value, report: &mut ValidationReport) {
        let Ok(fields) = record_fields(value) else {
            report.add_error(ValidationIssue {
                issue_type: IssueType::TypeMismatch,
                field: None,
                message: "Expected record type".to_string(),
                severity: Severity::Error,
            });
            return;
        };

        let mut missing = false;
        for name in &self.fields {
            if lookup(fields, name).is_none() {
                missing = true;
                report.add_error(ValidationIssue {
                    issue_type: IssueType::MissingField,
                    field: Some(name.clone()),
                    message: format!("Required field '{}' is missing", name),
                    severity: Severity::Error,
                });
            }
        }

        if !missing && !value.validate(&self.schema) {
            report.add_error(ValidationIssue {
                issue_type: IssueType::TypeMismatch,
                field: None,
                message: "Record does not conform to the schema types".to_string(),
                severity: Severity::Error,
            });
        }
    }

    fn validate_physics(&self, fields: &[(String, Value)], report: &mut ValidationReport) {
        for (name, constraints) in &self.constraints {
            let Some(value) = lookup(fields, name).and_then(as_number) else {
                continue;
            };

            if !constraints.contains(value) {
                report.add_error(ValidationIssue {
                    issue_type: IssueType::PhysicsViolation,
                    field: Some(name.clone()),
                    message: format!(
                        "Value {} outside [{}, {}] {}",
                        value,
                        constraints.min.map_or("-inf".to_string(), |v| v.to_string()),
                        constraints.max.map_or("inf".to_string(), |v| v.to_string()),
                        constraints.display_unit()
                    ),
                    severity: Severity::Error,
                });
            } else if !constraints.is_typical(value) {
                report.add_warning(ValidationIssue {
                    issue_type: IssueType::UnusualValue,
                    field: Some(name.clone()),
                    message: format!("Value {} {} is unusual", value, constraints.display_unit()),
                    severity: Severity::Warning,
                });
            }
        }
    }
}

/// Allowance for rounding on fractional timeline steps (m/s)
const SPEED_TOLERANCE_MPS: f64 = 1e-6;

fn frame_point(fields: &[(String, Value)]) -> Option<(f64, f64, f64)> {
    let get = |name| lookup(fields, name).and_then(as_number);
    Some((get("timestamp_ms")?, get("x")?, get("y")?))
}

/// Validation report containing all issues found
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Validation errors (must be fixed)
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (should be reviewed)
    pub warnings: Vec<ValidationIssue>,

    /// Informational messages
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Add a warning
    pub fn add_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Add info
    pub fn add_info(&mut self, issue: ValidationIssue) {
        self.info.push(issue);
    }

    /// Append another report's issues
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.info.extend(other.info);
    }

    /// Get total issue count
    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }

    /// Whether any error has the given type
    pub fn has_error(&self, issue_type: IssueType) -> bool {
        self.errors.iter().any(|e| e.issue_type == issue_type)
    }
}

/// Individual validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Type of issue
    pub issue_type: IssueType,

    /// Field that caused the issue (if applicable)
    pub field: Option<String>,

    /// Human-readable message
    pub message: String,

    /// Issue severity
    pub severity: Severity,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    /// Required field is missing
    MissingField,

    /// Type doesn't match schema
    TypeMismatch,

    /// Value outside its physical range
    PhysicsViolation,

    /// Value is unusual but not impossible
    UnusualValue,

    /// Implied speed between frames too high
    RateViolation,

    /// Frame timestamps not increasing
    OrderViolation,
}

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational only
    Info,

    /// Should be reviewed
    Warning,

    /// Must be fixed
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::AvroRecord;
    use uwbtrack_core::{FrameSource, Point2, RangeMeasurement, TrackState, TrajectoryFrame};

    fn frame_at(ts: f64, x: f64) -> Value {
        TrajectoryFrame::new(ts, Point2::new(x, 5.0), FrameSource::Measured, TrackState::Tracking).to_avro_value()
    }

    #[test]
    fn validate_range_record() {
        let validator = RecordValidator::ranging().unwrap();
        let report = validator.validate(&RangeMeasurement::new(1, 1_000, 10, 4.5).to_avro_value());
        assert!(report.is_valid(), "{:?}", report);
        assert_eq!(report.total_issues(), 0);
    }

    #[test]
    fn detect_missing_field() {
        let validator = RecordValidator::ranging().unwrap();
        let value = Value::Record(vec![("tag_id".to_string(), Value::Long(1))]);

        let report = validator.validate(&value);
        assert!(!report.is_valid());
        assert!(report.has_error(IssueType::MissingField));
        assert!(report.errors.iter().any(|e| e.field.as_deref() == Some("raw_distance_m")));
    }

    #[test]
    fn detect_type_mismatch() {
        let validator = RecordValidator::ranging().unwrap();
        assert!(validator.validate(&Value::Long(3)).has_error(IssueType::TypeMismatch));

        let mut value = RangeMeasurement::new(1, 0, 10, 4.5).to_avro_value();
        if let Value::Record(fields) = &mut value {
            fields[4].1 = Value::String("far".to_string());
        }
        assert!(validator.validate(&value).has_error(IssueType::TypeMismatch));
    }

    #[test]
    fn distance_out_of_range() {
        let validator = RecordValidator::ranging().unwrap();
        let report = validator.validate(&RangeMeasurement::new(1, 0, 10, 250.0).to_avro_value());
        assert!(report.has_error(IssueType::PhysicsViolation));

        let report = validator.validate(&RangeMeasurement::new(1, 0, 10, f64::NAN).to_avro_value());
        assert!(report.has_error(IssueType::PhysicsViolation));
    }

    #[test]
    fn weak_signal_is_a_warning() {
        let validator = RecordValidator::ranging().unwrap();
        let range = RangeMeasurement::new(1, 0, 10, 4.0).with_signal(-110.0);
        let report = validator.validate(&range.to_avro_value());
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].issue_type, IssueType::UnusualValue);
    }

    #[test]
    fn speed_between_frames() {
        let validator = RecordValidator::trajectory().unwrap();

        // 0.1 m per 20 ms = 5 m/s
        let steady: Vec<_> = (0..5).map(|i| frame_at(i as f64 * 20.0, 10.0 + i as f64 * 0.1)).collect();
        assert!(validator.validate_sequence(&steady).is_valid());

        // 0.2 m per 20 ms = 10 m/s
        let jump = vec![frame_at(0.0, 10.0), frame_at(20.0, 10.2)];
        let report = validator.validate_sequence(&jump);
        assert!(report.has_error(IssueType::RateViolation));
    }

    #[test]
    fn stricter_limit_overrides_schema() {
        let walking = FieldConstraints::unit("m").with_max_speed(2.5);
        let validator = RecordValidator::trajectory().unwrap().with_constraints("x", walking);
        assert_eq!(validator.constraints("x").unwrap().max_speed_mps, Some(2.5));

        let frames = vec![frame_at(0.0, 10.0), frame_at(100.0, 10.5)];
        assert!(validator.validate_sequence(&frames).has_error(IssueType::RateViolation));
    }

    #[test]
    fn out_of_order_frames() {
        let validator = RecordValidator::trajectory().unwrap();
        let frames = vec![frame_at(40.0, 10.0), frame_at(40.0, 10.0)];
        assert!(validator.validate_sequence(&frames).has_error(IssueType::OrderViolation));
    }

    #[test]
    fn validator_from_registry() {
        let registry = SchemaRegistry::new();
        registry.load_defaults().unwrap();
        let validator = RecordValidator::from_registry(&registry, "trajectory_frame").unwrap();
        assert!(validator.constraints("x").is_some());
        assert!(RecordValidator::from_registry(&registry, "missing").is_err());
    }
}
