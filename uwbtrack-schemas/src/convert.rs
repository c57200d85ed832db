//! Conversions between core types and Avro values
//!
//! [`AvroRecord`] ties a core type to its bundled schema. Container helpers
//! write and read whole batches as Avro object container files, with the
//! schema embedded in the header.

use apache_avro::{types::Value, Reader, Writer};
use uwbtrack_core::{
    AnchorStatus, FrameSource, Point2, RangeMeasurement, TrackState, TrajectoryFrame,
};

use crate::{
    schemas::{self, SchemaDefinition},
    SchemaError,
};

/// Core type with a bundled Avro schema
pub trait AvroRecord: Sized {
    /// Schema the value is written with
    fn definition() -> Result<SchemaDefinition, SchemaError>;

    /// Record value matching [`AvroRecord::definition`]
    fn to_avro_value(&self) -> Value;

    /// Rebuild from a record value
    fn from_avro_value(value: &Value) -> Result<Self, SchemaError>;
}

/// Convert a core value into its Avro record
pub fn to_avro_value<T: AvroRecord>(record: &T) -> Value {
    record.to_avro_value()
}

/// Convert an Avro record back into a core value
pub fn from_avro_value<T: AvroRecord>(value: &Value) -> Result<T, SchemaError> {
    T::from_avro_value(value)
}

/// Write records as an Avro object container
pub fn encode_datum<T: AvroRecord>(records: &[T]) -> Result<Vec<u8>, SchemaError> {
    let definition = T::definition()?;
    let mut writer = Writer::new(&definition.schema, Vec::new());
    for record in records {
        writer.append(record.to_avro_value())?;
    }
    Ok(writer.into_inner()?)
}

/// Read records from an Avro object container
pub fn decode_datum<T: AvroRecord>(bytes: &[u8]) -> Result<Vec<T>, SchemaError> {
    let reader = Reader::new(bytes)?;
    reader.map(|value| T::from_avro_value(&value?)).collect()
}

impl AvroRecord for RangeMeasurement {
    fn definition() -> Result<SchemaDefinition, SchemaError> {
        schemas::ranging_record_v1()
    }

    fn to_avro_value(&self) -> Value {
        let (index, symbol) = match self.status {
            AnchorStatus::Ok => (0, "OK"),
            AnchorStatus::Fail => (1, "FAIL"),
        };
        Value::Record(vec![
            ("tag_id".to_string(), Value::Long(i64::from(self.tag_id))),
            ("device_timestamp_ms".to_string(), Value::Long(clamp_timestamp(self.device_timestamp_ms))),
            ("system_timestamp_ms".to_string(), Value::Long(clamp_timestamp(self.system_timestamp_ms))),
            ("anchor_id".to_string(), Value::Long(i64::from(self.anchor_id))),
            ("raw_distance_m".to_string(), Value::Double(self.raw_distance_m)),
            ("filtered_distance_m".to_string(), Value::Double(self.filtered_distance_m)),
            ("signal_dbm".to_string(), Value::Double(self.signal_dbm)),
            ("anchor_status".to_string(), Value::Enum(index, symbol.to_string())),
        ])
    }

    fn from_avro_value(value: &Value) -> Result<Self, SchemaError> {
        let fields = record_fields(value)?;
        let status = match enum_symbol(fields, "anchor_status")? {
            "OK" => AnchorStatus::Ok,
            _ => AnchorStatus::Fail,
        };
        Ok(Self {
            tag_id: id_field(fields, "tag_id")?,
            device_timestamp_ms: timestamp_field(fields, "device_timestamp_ms")?,
            system_timestamp_ms: timestamp_field(fields, "system_timestamp_ms")?,
            anchor_id: id_field(fields, "anchor_id")?,
            raw_distance_m: number_field(fields, "raw_distance_m")?,
            filtered_distance_m: number_field(fields, "filtered_distance_m")?,
            signal_dbm: number_field(fields, "signal_dbm")?,
            status,
        })
    }
}

impl AvroRecord for TrajectoryFrame {
    fn definition() -> Result<SchemaDefinition, SchemaError> {
        schemas::trajectory_frame_v1()
    }

    fn to_avro_value(&self) -> Value {
        let optional = |v: Option<f64>| match v {
            Some(v) => Value::Union(1, Box::new(Value::Double(v))),
            None => Value::Union(0, Box::new(Value::Null)),
        };
        let source = match self.source {
            FrameSource::Measured => 0,
            FrameSource::Predicted => 1,
            FrameSource::Interpolated => 2,
        };
        let state = match self.track_state {
            TrackState::Uninitialized => 0,
            TrackState::Tracking => 1,
            TrackState::Coasting => 2,
            TrackState::Lost => 3,
        };
        Value::Record(vec![
            ("timestamp_ms".to_string(), Value::Double(self.timestamp_ms)),
            ("x".to_string(), Value::Double(self.position.x)),
            ("y".to_string(), Value::Double(self.position.y)),
            ("velocity_x".to_string(), optional(self.velocity.map(|v| v.x))),
            ("velocity_y".to_string(), optional(self.velocity.map(|v| v.y))),
            ("source".to_string(), Value::Enum(source, self.source.as_str().to_string())),
            ("track_state".to_string(), Value::Enum(state, self.track_state.as_str().to_string())),
            ("cumulative_distance_m".to_string(), Value::Double(self.cumulative_distance)),
        ])
    }

    fn from_avro_value(value: &Value) -> Result<Self, SchemaError> {
        let fields = record_fields(value)?;
        let source = match enum_symbol(fields, "source")? {
            "MEASURED" => FrameSource::Measured,
            "PREDICTED" => FrameSource::Predicted,
            "INTERPOLATED" => FrameSource::Interpolated,
            other => return Err(SchemaError::InvalidRecord(format!("unknown frame source {other}"))),
        };
        let track_state = match enum_symbol(fields, "track_state")? {
            "UNINITIALIZED" => TrackState::Uninitialized,
            "TRACKING" => TrackState::Tracking,
            "COASTING" => TrackState::Coasting,
            "LOST" => TrackState::Lost,
            other => return Err(SchemaError::InvalidRecord(format!("unknown track state {other}"))),
        };
        let velocity = match (
            optional_number_field(fields, "velocity_x")?,
            optional_number_field(fields, "velocity_y")?,
        ) {
            (Some(x), Some(y)) => Some(Point2::new(x, y)),
            _ => None,
        };

        Ok(Self {
            timestamp_ms: number_field(fields, "timestamp_ms")?,
            position: Point2::new(number_field(fields, "x")?, number_field(fields, "y")?),
            velocity,
            source,
            track_state,
            cumulative_distance: number_field(fields, "cumulative_distance_m")?,
        })
    }
}

fn clamp_timestamp(ts: u64) -> i64 {
    i64::try_from(ts).unwrap_or(i64::MAX)
}

pub(crate) fn record_fields(value: &Value) -> Result<&[(String, Value)], SchemaError> {
    match value {
        Value::Record(fields) => Ok(fields),
        _ => Err(SchemaError::InvalidRecord("expected a record".to_string())),
    }
}

pub(crate) fn lookup<'a>(fields: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
}

fn required<'a>(fields: &'a [(String, Value)], name: &str) -> Result<&'a Value, SchemaError> {
    lookup(fields, name).ok_or_else(|| SchemaError::InvalidRecord(format!("missing field {name}")))
}

/// Numeric content of a value, looking through unions; `None` for null
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Double(v) => Some(*v),
        Value::Float(v) => Some(f64::from(*v)),
        Value::Long(v) => Some(*v as f64),
        Value::Int(v) => Some(f64::from(*v)),
        Value::Union(_, inner) => as_number(inner),
        _ => None,
    }
}

fn number_field(fields: &[(String, Value)], name: &str) -> Result<f64, SchemaError> {
    as_number(required(fields, name)?).ok_or_else(|| SchemaError::InvalidRecord(format!("{name} is not numeric")))
}

fn optional_number_field(fields: &[(String, Value)], name: &str) -> Result<Option<f64>, SchemaError> {
    match lookup(fields, name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Union(_, inner)) if matches!(**inner, Value::Null) => Ok(None),
        Some(value) => as_number(value)
            .map(Some)
            .ok_or_else(|| SchemaError::InvalidRecord(format!("{name} is not numeric"))),
    }
}

fn integer_field(fields: &[(String, Value)], name: &str) -> Result<i64, SchemaError> {
    match required(fields, name)? {
        Value::Long(v) => Ok(*v),
        Value::Int(v) => Ok(i64::from(*v)),
        _ => Err(SchemaError::InvalidRecord(format!("{name} is not an integer"))),
    }
}

fn id_field(fields: &[(String, Value)], name: &str) -> Result<u32, SchemaError> {
    let raw = integer_field(fields, name)?;
    u32::try_from(raw).map_err(|_| SchemaError::InvalidRecord(format!("{name} {raw} out of range")))
}

fn timestamp_field(fields: &[(String, Value)], name: &str) -> Result<u64, SchemaError> {
    let raw = integer_field(fields, name)?;
    u64::try_from(raw).map_err(|_| SchemaError::InvalidRecord(format!("{name} {raw} is negative")))
}

fn enum_symbol<'a>(fields: &'a [(String, Value)], name: &str) -> Result<&'a str, SchemaError> {
    match required(fields, name)? {
        Value::Enum(_, symbol) | Value::String(symbol) => Ok(symbol.as_str()),
        _ => Err(SchemaError::InvalidRecord(format!("{name} is not an enum"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> TrajectoryFrame {
        let mut frame = TrajectoryFrame::new(16.67, Point2::new(3.0, 4.5), FrameSource::Predicted, TrackState::Coasting)
            .with_velocity(Point2::new(1.0, -0.5));
        frame.cumulative_distance = 12.25;
        frame
    }

    #[test]
    fn range_value_matches_schema() {
        let definition = RangeMeasurement::definition().unwrap();
        let range = RangeMeasurement::new(7, 1_234, 20, 4.2).with_status(AnchorStatus::Fail);
        let value = to_avro_value(&range);
        assert!(value.validate(&definition.schema));
        assert_eq!(from_avro_value::<RangeMeasurement>(&value).unwrap(), range);
    }

    #[test]
    fn frame_value_matches_schema() {
        let definition = TrajectoryFrame::definition().unwrap();
        let value = frame().to_avro_value();
        assert!(value.validate(&definition.schema));
        assert_eq!(TrajectoryFrame::from_avro_value(&value).unwrap(), frame());
    }

    #[test]
    fn missing_velocity_is_none() {
        let mut frame = frame();
        frame.velocity = None;
        let decoded = TrajectoryFrame::from_avro_value(&frame.to_avro_value()).unwrap();
        assert_eq!(decoded.velocity, None);
    }

    #[test]
    fn container_keeps_batch() {
        let frames = vec![frame(), frame()];
        let bytes = encode_datum(&frames).unwrap();
        assert_eq!(decode_datum::<TrajectoryFrame>(&bytes).unwrap(), frames);
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(RangeMeasurement::from_avro_value(&Value::Null).is_err());

        let mut value = RangeMeasurement::new(1, 0, 10, 1.0).to_avro_value();
        if let Value::Record(fields) = &mut value {
            fields.retain(|(name, _)| name != "anchor_id");
        }
        assert!(RangeMeasurement::from_avro_value(&value).is_err());

        let negative = Value::Record(vec![("tag_id".to_string(), Value::Long(-1))]);
        assert!(RangeMeasurement::from_avro_value(&negative).is_err());
    }
}
