//! Snapshot comparison.
//!
//! [`compare`] walks the sorted union of collection names from both
//! snapshots and classifies every discrepancy. Field and index diffs are
//! nested inside their collection's difference. The walk is pure and
//! deterministic: same inputs, byte-identical output.

use crate::snapshot::{CollectionSchema, DatabaseSchema, FieldInfo, IndexInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Priority of a difference or sync operation.
///
/// Ordered `High < Medium < Low`, so sorting ascending puts the most urgent
/// work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must be resolved first (missing collections, required fields, type conflicts).
    High,
    /// Should be resolved (optional fields, missing indexes, requirement changes).
    Medium,
    /// Advisory (local-only additions, index option drift).
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

/// Classification of a field-level difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDiffKind {
    /// Present in the reference, absent locally.
    Missing,
    /// Present locally, absent from the reference.
    Added,
    /// Type or array-ness differs.
    TypeMismatch,
    /// Required flag differs.
    RequirementMismatch,
}

/// Classification of an index-level difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDiffKind {
    /// Present in the reference, absent locally.
    Missing,
    /// Present locally, absent from the reference.
    Added,
    /// Key list differs (fields, order, or direction).
    KeyMismatch,
    /// Unique or sparse option differs.
    OptionMismatch,
}

/// Classification of a collection-level difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionDiffKind {
    /// Present in the reference, absent locally.
    Missing,
    /// Present locally, absent from the reference.
    Added,
    /// Present in both with field or index differences.
    Modified,
}

/// One classified discrepancy between a reference and a local field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDifference {
    /// Field name.
    pub field: String,
    /// Reference-side shape, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldInfo>,
    /// Local-side shape, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<FieldInfo>,
    /// Classification.
    pub kind: FieldDiffKind,
    /// Human-readable description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
}

/// One classified discrepancy between a reference and a local index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDifference {
    /// Index name.
    pub index_name: String,
    /// Reference-side shape, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<IndexInfo>,
    /// Local-side shape, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<IndexInfo>,
    /// Classification.
    pub kind: IndexDiffKind,
    /// Human-readable description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
}

/// One classified discrepancy at the collection level, carrying nested field
/// and index differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDifference {
    /// Collection name.
    pub collection: String,
    /// Reference-side schema, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<CollectionSchema>,
    /// Local-side schema, if present there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<CollectionSchema>,
    /// Classification.
    pub kind: CollectionDiffKind,
    /// Nested field differences.
    pub field_differences: Vec<FieldDifference>,
    /// Nested index differences.
    pub index_differences: Vec<IndexDifference>,
    /// Human-readable description.
    pub description: String,
    /// Highest priority among children, or the collection's own
    /// classification when it is missing or added.
    pub priority: Priority,
}

impl CollectionDifference {
    /// Total number of nested differences.
    pub fn child_count(&self) -> usize {
        self.field_differences.len() + self.index_differences.len()
    }
}

/// Compares two snapshots and returns one difference per diverging
/// collection, in sorted collection-name order.
pub fn compare(reference: &DatabaseSchema, local: &DatabaseSchema) -> Vec<CollectionDifference> {
    let names: BTreeSet<&String> = reference
        .collections
        .keys()
        .chain(local.collections.keys())
        .collect();

    let mut differences = Vec::new();
    for name in names {
        match (
            reference.collections.get(name),
            local.collections.get(name),
        ) {
            (Some(ref_schema), None) => {
                differences.push(CollectionDifference {
                    collection: name.clone(),
                    reference: Some(ref_schema.clone()),
                    local: None,
                    kind: CollectionDiffKind::Missing,
                    field_differences: Vec::new(),
                    index_differences: Vec::new(),
                    description: format!(
                        "collection missing from local database ({} documents in reference)",
                        ref_schema.document_count
                    ),
                    priority: Priority::High,
                });
            }
            (None, Some(local_schema)) => {
                differences.push(CollectionDifference {
                    collection: name.clone(),
                    reference: None,
                    local: Some(local_schema.clone()),
                    kind: CollectionDiffKind::Added,
                    field_differences: Vec::new(),
                    index_differences: Vec::new(),
                    description: "collection only exists in local database".into(),
                    priority: Priority::Low,
                });
            }
            (Some(ref_schema), Some(local_schema)) => {
                let field_differences = diff_fields(&ref_schema.fields, &local_schema.fields);
                let index_differences = diff_indexes(&ref_schema.indexes, &local_schema.indexes);
                if field_differences.is_empty() && index_differences.is_empty() {
                    continue;
                }

                let any_high = field_differences
                    .iter()
                    .map(|d| d.priority)
                    .chain(index_differences.iter().map(|d| d.priority))
                    .any(|p| p == Priority::High);
                let priority = if any_high {
                    Priority::High
                } else {
                    Priority::Medium
                };

                let description = format!(
                    "{} field and {} index difference(s)",
                    field_differences.len(),
                    index_differences.len()
                );
                differences.push(CollectionDifference {
                    collection: name.clone(),
                    reference: Some(ref_schema.clone()),
                    local: Some(local_schema.clone()),
                    kind: CollectionDiffKind::Modified,
                    field_differences,
                    index_differences,
                    description,
                    priority,
                });
            }
            (None, None) => unreachable!("name came from the union of both maps"),
        }
    }

    tracing::debug!(
        reference = %reference.database_name,
        local = %local.database_name,
        differences = differences.len(),
        "snapshot comparison complete"
    );
    differences
}

fn diff_fields(
    reference: &BTreeMap<String, FieldInfo>,
    local: &BTreeMap<String, FieldInfo>,
) -> Vec<FieldDifference> {
    let names: BTreeSet<&String> = reference.keys().chain(local.keys()).collect();

    let mut differences = Vec::new();
    for name in names {
        match (reference.get(name), local.get(name)) {
            (Some(ref_field), None) => {
                let priority = if ref_field.is_required {
                    Priority::High
                } else {
                    Priority::Medium
                };
                let description = if ref_field.is_required {
                    format!(
                        "required field ({}) missing from local schema",
                        ref_field.type_label()
                    )
                } else {
                    format!(
                        "optional field ({}) missing from local schema",
                        ref_field.type_label()
                    )
                };
                differences.push(FieldDifference {
                    field: name.clone(),
                    reference: Some(ref_field.clone()),
                    local: None,
                    kind: FieldDiffKind::Missing,
                    description,
                    priority,
                });
            }
            (None, Some(local_field)) => {
                differences.push(FieldDifference {
                    field: name.clone(),
                    reference: None,
                    local: Some(local_field.clone()),
                    kind: FieldDiffKind::Added,
                    description: format!(
                        "field ({}) only exists in local schema",
                        local_field.type_label()
                    ),
                    priority: Priority::Low,
                });
            }
            (Some(ref_field), Some(local_field)) => {
                // Type and requirement drift are independent findings; both
                // may be emitted for the same field.
                if ref_field.field_type != local_field.field_type
                    || ref_field.is_array != local_field.is_array
                {
                    differences.push(FieldDifference {
                        field: name.clone(),
                        reference: Some(ref_field.clone()),
                        local: Some(local_field.clone()),
                        kind: FieldDiffKind::TypeMismatch,
                        description: format!(
                            "type differs: reference {} vs local {}",
                            ref_field.type_label(),
                            local_field.type_label()
                        ),
                        priority: Priority::High,
                    });
                }
                if ref_field.is_required != local_field.is_required {
                    let description = if ref_field.is_required {
                        "required in reference but optional locally".to_string()
                    } else {
                        "optional in reference but required locally".to_string()
                    };
                    differences.push(FieldDifference {
                        field: name.clone(),
                        reference: Some(ref_field.clone()),
                        local: Some(local_field.clone()),
                        kind: FieldDiffKind::RequirementMismatch,
                        description,
                        priority: Priority::Medium,
                    });
                }
            }
            (None, None) => unreachable!("name came from the union of both maps"),
        }
    }
    differences
}

fn diff_indexes(reference: &[IndexInfo], local: &[IndexInfo]) -> Vec<IndexDifference> {
    let ref_by_name: BTreeMap<&str, &IndexInfo> =
        reference.iter().map(|idx| (idx.name.as_str(), idx)).collect();
    let local_by_name: BTreeMap<&str, &IndexInfo> =
        local.iter().map(|idx| (idx.name.as_str(), idx)).collect();
    let names: BTreeSet<&str> = ref_by_name.keys().chain(local_by_name.keys()).copied().collect();

    let mut differences = Vec::new();
    for name in names {
        match (ref_by_name.get(name), local_by_name.get(name)) {
            (Some(ref_index), None) => {
                differences.push(IndexDifference {
                    index_name: name.to_string(),
                    reference: Some((*ref_index).clone()),
                    local: None,
                    kind: IndexDiffKind::Missing,
                    description: format!(
                        "index {} missing from local schema",
                        ref_index.key_spec()
                    ),
                    priority: Priority::Medium,
                });
            }
            (None, Some(local_index)) => {
                differences.push(IndexDifference {
                    index_name: name.to_string(),
                    reference: None,
                    local: Some((*local_index).clone()),
                    kind: IndexDiffKind::Added,
                    description: format!(
                        "index {} only exists in local schema",
                        local_index.key_spec()
                    ),
                    priority: Priority::Low,
                });
            }
            (Some(ref_index), Some(local_index)) => {
                // Key structure and options are independent findings.
                if ref_index.keys != local_index.keys {
                    differences.push(IndexDifference {
                        index_name: name.to_string(),
                        reference: Some((*ref_index).clone()),
                        local: Some((*local_index).clone()),
                        kind: IndexDiffKind::KeyMismatch,
                        description: format!(
                            "index keys differ: reference {} vs local {}",
                            ref_index.key_spec(),
                            local_index.key_spec()
                        ),
                        priority: Priority::Medium,
                    });
                }
                let mut drifted = Vec::new();
                if ref_index.unique != local_index.unique {
                    drifted.push(format!(
                        "unique: {} vs {}",
                        ref_index.unique, local_index.unique
                    ));
                }
                if ref_index.sparse != local_index.sparse {
                    drifted.push(format!(
                        "sparse: {} vs {}",
                        ref_index.sparse, local_index.sparse
                    ));
                }
                if !drifted.is_empty() {
                    differences.push(IndexDifference {
                        index_name: name.to_string(),
                        reference: Some((*ref_index).clone()),
                        local: Some((*local_index).clone()),
                        kind: IndexDiffKind::OptionMismatch,
                        description: format!("index options differ ({})", drifted.join(", ")),
                        priority: Priority::Low,
                    });
                }
            }
            (None, None) => unreachable!("name came from the union of both maps"),
        }
    }
    differences
}
