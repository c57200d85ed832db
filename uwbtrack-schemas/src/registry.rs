//! Schema Registry for Version Management
//!
//! Central, thread-safe lookup of schema definitions by qualified name
//! (`ranging_record_v1`) or by base name for the latest version.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use apache_avro::Schema;

use crate::{
    physics::{self, FieldConstraints},
    schemas::{self, SchemaDefinition},
    SchemaError,
};

/// Schema metadata for registry entries
#[derive(Debug, Clone)]
pub struct SchemaMetadata {
    /// Schema name (e.g., "ranging_record")
    pub name: String,

    /// Schema version (e.g., "v1", "v2")
    pub version: String,

    /// Full qualified name (e.g., "ranging_record_v1")
    pub qualified_name: String,

    /// Schema namespace
    pub namespace: String,

    /// Whether this schema is deprecated
    pub deprecated: bool,

    /// Replacement schema if deprecated
    pub replacement: Option<String>,

    /// Constraints embedded in the schema, by field
    pub constraints: BTreeMap<String, FieldConstraints>,
}

struct Entry {
    definition: SchemaDefinition,
    metadata: SchemaMetadata,
}

/// Thread-safe schema registry with version management
pub struct SchemaRegistry {
    /// Schemas indexed by qualified name
    schemas: RwLock<HashMap<String, Entry>>,

    /// Version mappings (name -> [versions])
    versions: RwLock<HashMap<String, Vec<String>>>,

    /// Latest version for each schema name
    latest: RwLock<HashMap<String, String>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            versions: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Register a definition with explicit metadata
    pub fn register_with_metadata(
        &self,
        definition: SchemaDefinition,
        metadata: SchemaMetadata,
    ) -> Result<(), SchemaError> {
        let qualified_name = metadata.qualified_name.clone();
        let base_name = metadata.name.clone();
        let version = metadata.version.clone();

        self.validate_schema(&definition, &metadata)?;

        {
            let mut schemas = self.schemas.write().map_err(|_| SchemaError::LockPoisoned)?;
            schemas.insert(qualified_name, Entry { definition, metadata });
        }

        {
            let mut versions = self.versions.write().map_err(|_| SchemaError::LockPoisoned)?;
            versions.entry(base_name.clone()).or_default().push(version.clone());
        }

        {
            let mut latest = self.latest.write().map_err(|_| SchemaError::LockPoisoned)?;
            let newer = latest
                .get(&base_name)
                .map_or(true, |current| version_number(&version) > version_number(current));
            if newer {
                latest.insert(base_name, version);
            }
        }

        Ok(())
    }

    /// Register a definition, taking the version from a `_vN` suffix
    ///
    /// Constraints are extracted from the definition's JSON.
    pub fn register(&self, name: &str, definition: SchemaDefinition) -> Result<(), SchemaError> {
        let (base_name, version) = split_version(name);
        let metadata = SchemaMetadata {
            name: base_name.to_string(),
            version: version.to_string(),
            qualified_name: name.to_string(),
            namespace: definition.namespace().unwrap_or(schemas::NAMESPACE).to_string(),
            deprecated: false,
            replacement: None,
            constraints: physics::extract_from_schema(&definition.json),
        };

        self.register_with_metadata(definition, metadata)
    }

    /// Get a schema by qualified name
    pub fn get(&self, name: &str) -> Result<Schema, SchemaError> {
        self.get_definition(name).map(|definition| definition.schema)
    }

    /// Get a definition, JSON included, by qualified name
    pub fn get_definition(&self, name: &str) -> Result<SchemaDefinition, SchemaError> {
        let schemas = self.schemas.read().map_err(|_| SchemaError::LockPoisoned)?;

        schemas
            .get(name)
            .map(|entry| entry.definition.clone())
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Qualified name of the latest version of a schema
    pub fn latest_name(&self, base_name: &str) -> Result<String, SchemaError> {
        let latest = self.latest.read().map_err(|_| SchemaError::LockPoisoned)?;

        latest
            .get(base_name)
            .map(|version| format!("{}_{}", base_name, version))
            .ok_or_else(|| SchemaError::NotFound(format!("No versions of {}", base_name)))
    }

    /// Get the latest version of a schema
    pub fn get_latest(&self, base_name: &str) -> Result<Schema, SchemaError> {
        let qualified_name = self.latest_name(base_name)?;
        self.get(&qualified_name)
    }

    /// Get all versions of a schema
    pub fn get_versions(&self, base_name: &str) -> Result<Vec<String>, SchemaError> {
        let versions = self.versions.read().map_err(|_| SchemaError::LockPoisoned)?;

        Ok(versions.get(base_name).cloned().unwrap_or_default())
    }

    /// Get schema metadata
    pub fn get_metadata(&self, name: &str) -> Result<SchemaMetadata, SchemaError> {
        let schemas = self.schemas.read().map_err(|_| SchemaError::LockPoisoned)?;

        schemas
            .get(name)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Check if a reader schema can read data written with a writer schema
    ///
    /// Both must name the same record, and every reader field must either
    /// exist in the writer or declare a default.
    pub fn is_compatible(&self, writer_schema: &str, reader_schema: &str) -> Result<bool, SchemaError> {
        let writer = self.get_definition(writer_schema)?;
        let reader = self.get_definition(reader_schema)?;

        if writer.schema.name() != reader.schema.name() {
            return Ok(false);
        }
        let written = physics::field_names(&writer.json);
        let compatible = reader
            .json
            .get("fields")
            .and_then(|f| f.as_array())
            .map_or(true, |fields| {
                fields.iter().all(|field| {
                    let named = field
                        .get("name")
                        .and_then(|n| n.as_str())
                        .map_or(false, |name| written.iter().any(|w| w == name));
                    named || field.get("default").is_some()
                })
            });
        Ok(compatible)
    }

    /// Mark a schema as deprecated
    pub fn deprecate(&self, name: &str, replacement: Option<String>) -> Result<(), SchemaError> {
        let mut schemas = self.schemas.write().map_err(|_| SchemaError::LockPoisoned)?;

        let entry = schemas
            .get_mut(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        entry.metadata.deprecated = true;
        entry.metadata.replacement = replacement;

        Ok(())
    }

    /// Validate a schema before registration
    fn validate_schema(&self, definition: &SchemaDefinition, metadata: &SchemaMetadata) -> Result<(), SchemaError> {
        if self.get(&metadata.qualified_name).is_ok() {
            return Err(SchemaError::ValidationError(format!(
                "Schema {} already registered",
                metadata.qualified_name
            )));
        }
        if !matches!(definition.schema, Schema::Record { .. }) {
            return Err(SchemaError::ValidationError(format!(
                "Schema {} is not a record",
                metadata.qualified_name
            )));
        }

        Ok(())
    }

    /// Load the bundled schemas
    pub fn load_defaults(&self) -> Result<(), SchemaError> {
        self.register("ranging_record_v1", schemas::ranging_record_v1()?)?;
        self.register("trajectory_frame_v1", schemas::trajectory_frame_v1()?)?;

        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn split_version(name: &str) -> (&str, &str) {
    match name.rfind("_v") {
        Some(pos) if name[pos + 2..].chars().all(|c| c.is_ascii_digit()) && pos + 2 < name.len() => {
            (&name[..pos], &name[pos + 1..])
        }
        _ => (name, "v1"),
    }
}

fn version_number(version: &str) -> u64 {
    version.trim_start_matches('v').parse().unwrap_or(0)
}

lazy_static::lazy_static! {
    /// Global schema registry with the bundled schemas loaded
    pub static ref GLOBAL_REGISTRY: SchemaRegistry = {
        let registry = SchemaRegistry::new();
        if let Err(err) = registry.load_defaults() {
            log::warn!("bundled schemas failed to load: {}", err);
        }
        registry
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_and_retrieve() {
        let registry = SchemaRegistry::new();
        let definition = schemas::ranging_record_v1().unwrap();

        registry.register("test_schema_v1", definition.clone()).unwrap();

        let retrieved = registry.get("test_schema_v1").unwrap();
        assert_eq!(definition.schema.name(), retrieved.name());
        assert!(registry.get("other_v1").is_err());
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = SchemaRegistry::new();
        registry.register("frame_v1", schemas::trajectory_frame_v1().unwrap()).unwrap();
        assert!(registry.register("frame_v1", schemas::trajectory_frame_v1().unwrap()).is_err());
    }

    #[test]
    fn version_tracking() {
        let registry = SchemaRegistry::new();

        registry.register("test_v1", schemas::ranging_record_v1().unwrap()).unwrap();
        registry.register("test_v2", schemas::ranging_record_v1().unwrap()).unwrap();

        let versions = registry.get_versions("test").unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions.contains(&"v1".to_string()));
        assert!(versions.contains(&"v2".to_string()));
    }

    #[test]
    fn latest_version_compares_numerically() {
        let registry = SchemaRegistry::new();

        registry.register("frame_v10", schemas::trajectory_frame_v1().unwrap()).unwrap();
        registry.register("frame_v2", schemas::trajectory_frame_v1().unwrap()).unwrap();

        assert_eq!(registry.latest_name("frame").unwrap(), "frame_v10");
        assert!(registry.get_latest("frame").is_ok());
    }

    #[test]
    fn unversioned_names_default_to_v1() {
        assert_eq!(split_version("ranging_record"), ("ranging_record", "v1"));
        assert_eq!(split_version("ranging_record_v3"), ("ranging_record", "v3"));
        assert_eq!(split_version("velocity_values"), ("velocity_values", "v1"));
    }

    #[test]
    fn metadata_carries_constraints() {
        let registry = SchemaRegistry::new();
        registry.load_defaults().unwrap();

        let metadata = registry.get_metadata("ranging_record_v1").unwrap();
        assert_eq!(metadata.namespace, schemas::NAMESPACE);
        assert!(metadata.constraints.contains_key("raw_distance_m"));
    }

    #[test]
    fn deprecation() {
        let registry = SchemaRegistry::new();

        registry.register("old_schema_v1", schemas::ranging_record_v1().unwrap()).unwrap();
        registry.deprecate("old_schema_v1", Some("new_schema_v1".to_string())).unwrap();

        let metadata = registry.get_metadata("old_schema_v1").unwrap();
        assert!(metadata.deprecated);
        assert_eq!(metadata.replacement, Some("new_schema_v1".to_string()));
    }

    #[test]
    fn appended_field_needs_default() {
        let registry = SchemaRegistry::new();
        registry.register("frame_v1", schemas::trajectory_frame_v1().unwrap()).unwrap();

        let mut extended = schemas::trajectory_frame_v1().unwrap().json;
        if let Some(fields) = extended.get_mut("fields").and_then(|f| f.as_array_mut()) {
            fields.push(json!({"name": "quality", "type": "double", "default": 1.0}));
        }
        registry.register("frame_v2", SchemaDefinition::parse(extended.clone()).unwrap()).unwrap();

        if let Some(fields) = extended.get_mut("fields").and_then(|f| f.as_array_mut()) {
            fields.push(json!({"name": "zone", "type": "string"}));
        }
        registry.register("frame_v3", SchemaDefinition::parse(extended).unwrap()).unwrap();

        assert!(registry.is_compatible("frame_v1", "frame_v2").unwrap());
        assert!(!registry.is_compatible("frame_v1", "frame_v3").unwrap());
        assert!(registry.is_compatible("frame_v3", "frame_v1").unwrap());
    }

    #[test]
    fn global_registry_has_defaults() {
        assert!(GLOBAL_REGISTRY.get_latest("ranging_record").is_ok());
        assert!(GLOBAL_REGISTRY.get_latest("trajectory_frame").is_ok());
    }
}
