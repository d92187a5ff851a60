//! Snapshot model shared by the differ, plan builder, and execution engine.
//!
//! Snapshots are produced by an external extraction tool and read from JSON
//! files. Maps are `BTreeMap` so both iteration order and serialized output
//! are canonical.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Semantic type of a document field.
///
/// Unknown type names deserialize to [`FieldType::Mixed`], so a field's type
/// is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Numeric value (integer or float).
    Number,
    /// Boolean value.
    Boolean,
    /// Embedded document.
    Object,
    /// Array value.
    Array,
    /// Date/time value.
    Date,
    /// Mixed or unknown type.
    #[serde(other)]
    Mixed,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Date => "date",
            FieldType::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Describes one field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    /// Semantic type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field holds an array of its type.
    #[serde(default)]
    pub is_array: bool,
    /// Whether the field is required.
    #[serde(default)]
    pub is_required: bool,
    /// Whether the field declares a default value.
    #[serde(default)]
    pub has_default: bool,
    /// The declared default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Nested field map for embedded objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_fields: Option<BTreeMap<String, FieldInfo>>,
}

impl FieldInfo {
    /// Creates an optional field of the given type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_array: false,
            is_required: false,
            has_default: false,
            default_value: None,
            nested_fields: None,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Marks the field as holding an array of its type.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Sets a declared default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.has_default = true;
        self.default_value = Some(value);
        self
    }

    /// Renders the type for human-readable output, e.g. `array<string>`.
    pub fn type_label(&self) -> String {
        if self.is_array {
            format!("array<{}>", self.field_type)
        } else {
            self.field_type.to_string()
        }
    }
}

/// Sort direction of one index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl IndexDirection {
    /// Numeric form used in index specifications (`1` or `-1`).
    pub fn as_int(&self) -> i8 {
        match self {
            IndexDirection::Ascending => 1,
            IndexDirection::Descending => -1,
        }
    }
}

/// One key of an index. Key order within an index is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexKey {
    /// Field the key covers.
    pub field: String,
    /// Sort direction.
    pub direction: IndexDirection,
}

impl IndexKey {
    /// Creates an ascending key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: IndexDirection::Ascending,
        }
    }

    /// Creates a descending key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: IndexDirection::Descending,
        }
    }
}

/// Describes one index of a collection.
///
/// `name` uniquely identifies an index within its collection; `keys` is
/// ordered and order-significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Index name, unique within the collection.
    pub name: String,
    /// Ordered index keys.
    pub keys: Vec<IndexKey>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Whether the index skips documents lacking the indexed fields.
    #[serde(default)]
    pub sparse: bool,
    /// Whether the index was built in the background.
    #[serde(default)]
    pub background: bool,
    /// Engine-specific options (e.g. text-index weights).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

impl IndexInfo {
    /// Creates a plain index over the given keys.
    pub fn new(name: impl Into<String>, keys: Vec<IndexKey>) -> Self {
        Self {
            name: name.into(),
            keys,
            unique: false,
            sparse: false,
            background: false,
            options: BTreeMap::new(),
        }
    }

    /// Sets the unique flag.
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Sets the sparse flag.
    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    /// Renders the key list for human-readable output, e.g. `{email: 1}`.
    pub fn key_spec(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{}: {}", k.field, k.direction.as_int()))
            .collect();
        format!("{{ {} }}", keys.join(", "))
    }
}

/// Structural description of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    /// Collection name.
    pub name: String,
    /// Number of documents at capture time.
    #[serde(default)]
    pub document_count: u64,
    /// Average document size in bytes.
    #[serde(default)]
    pub avg_document_size: f64,
    /// Total collection size in bytes.
    #[serde(default)]
    pub total_size: u64,
    /// Field map, keyed by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldInfo>,
    /// Index list.
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    /// Sample documents, diagnostic only. Never consulted by the differ.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_documents: Vec<Value>,
}

impl CollectionSchema {
    /// Creates an empty collection schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document_count: 0,
            avg_document_size: 0.0,
            total_size: 0,
            fields: BTreeMap::new(),
            indexes: Vec::new(),
            sample_documents: Vec::new(),
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, name: impl Into<String>, info: FieldInfo) -> Self {
        self.fields.insert(name.into(), info);
        self
    }

    /// Adds an index.
    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the document count.
    pub fn with_document_count(mut self, count: u64) -> Self {
        self.document_count = count;
        self
    }

    /// Looks up an index by name.
    pub fn index(&self, name: &str) -> Option<&IndexInfo> {
        self.indexes.iter().find(|idx| idx.name == name)
    }
}

/// Structural snapshot of a whole database.
///
/// Two instances — a *reference* and a *local* one — are the sole inputs to
/// the differ. Snapshots are immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSchema {
    /// Database name.
    pub database_name: String,
    /// Number of collections at capture time.
    #[serde(default)]
    pub total_collections: u64,
    /// Number of documents at capture time.
    #[serde(default)]
    pub total_documents: u64,
    /// Total database size in bytes.
    #[serde(default)]
    pub total_size: u64,
    /// Collection map, keyed by collection name.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSchema>,
    /// Capture timestamp.
    pub extracted_at: DateTime<Utc>,
}

impl DatabaseSchema {
    /// Creates an empty snapshot captured now.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            total_collections: 0,
            total_documents: 0,
            total_size: 0,
            collections: BTreeMap::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Adds a collection under its own name.
    pub fn with_collection(mut self, collection: CollectionSchema) -> Self {
        self.total_collections += 1;
        self.total_documents += collection.document_count;
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    /// Loads a snapshot from a JSON file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let data = fs::read_to_string(path).map_err(|source| CoreError::SnapshotLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Self =
            serde_json::from_str(&data).map_err(|source| CoreError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            database = %schema.database_name,
            collections = schema.collections.len(),
            "loaded snapshot"
        );
        Ok(schema)
    }

    /// Saves the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Checks the structural invariants serde cannot enforce.
    ///
    /// Collection map keys must match each schema's own name, index names
    /// must be unique within a collection, and index key lists must be
    /// non-empty.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, collection) in &self.collections {
            if *name != collection.name {
                return Err(CoreError::invalid_snapshot(format!(
                    "collection map key {:?} does not match schema name {:?}",
                    name, collection.name
                )));
            }
            let mut seen = BTreeSet::new();
            for index in &collection.indexes {
                if index.keys.is_empty() {
                    return Err(CoreError::invalid_snapshot(format!(
                        "index {:?} on collection {:?} has no keys",
                        index.name, name
                    )));
                }
                if !seen.insert(index.name.as_str()) {
                    return Err(CoreError::invalid_snapshot(format!(
                        "duplicate index name {:?} on collection {:?}",
                        index.name, name
                    )));
                }
            }
        }
        Ok(())
    }

    /// SHA-256 hex digest of the canonical JSON form.
    ///
    /// Recorded in diff reports so decoupled runs can detect snapshot drift.
    pub fn fingerprint(&self) -> CoreResult<String> {
        let data = serde_json::to_vec(self)?;
        Ok(sha256_hex(&data))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> DatabaseSchema {
        DatabaseSchema::new("app").with_collection(
            CollectionSchema::new("users")
                .with_document_count(3)
                .with_field("email", FieldInfo::new(FieldType::String).required())
                .with_field("age", FieldInfo::new(FieldType::Number))
                .with_index(IndexInfo::new("idx_email", vec![IndexKey::asc("email")]).with_unique(true)),
        )
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.json");

        let schema = users_schema();
        schema.save(&path).unwrap();

        let loaded = DatabaseSchema::load(&path).unwrap();
        assert_eq!(loaded, schema);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = DatabaseSchema::load(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(matches!(err, CoreError::SnapshotLoad { .. }));
    }

    #[test]
    fn load_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = DatabaseSchema::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::SnapshotParse { .. }));
    }

    #[test]
    fn unknown_field_type_parses_as_mixed() {
        let json = r#"{"type": "objectId", "isArray": false}"#;
        let info: FieldInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.field_type, FieldType::Mixed);
    }

    #[test]
    fn validate_rejects_duplicate_index_names() {
        let schema = DatabaseSchema::new("app").with_collection(
            CollectionSchema::new("users")
                .with_index(IndexInfo::new("idx_a", vec![IndexKey::asc("a")]))
                .with_index(IndexInfo::new("idx_a", vec![IndexKey::asc("b")])),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_index_keys() {
        let schema = DatabaseSchema::new("app")
            .with_collection(CollectionSchema::new("users").with_index(IndexInfo::new("idx_a", vec![])));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn validate_rejects_mismatched_map_key() {
        let mut schema = DatabaseSchema::new("app");
        schema
            .collections
            .insert("users".into(), CollectionSchema::new("accounts"));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = users_schema();
        let b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let mut c = a.clone();
        c.collections
            .get_mut("users")
            .unwrap()
            .fields
            .insert("nickname".into(), FieldInfo::new(FieldType::String));
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn type_labels() {
        assert_eq!(FieldInfo::new(FieldType::String).type_label(), "string");
        assert_eq!(
            FieldInfo::new(FieldType::Number).array().type_label(),
            "array<number>"
        );
    }

    #[test]
    fn index_key_spec_rendering() {
        let index = IndexInfo::new(
            "idx_compound",
            vec![IndexKey::asc("email"), IndexKey::desc("createdAt")],
        );
        assert_eq!(index.key_spec(), "{ email: 1, createdAt: -1 }");
    }
}
