//! Sync plan derivation.
//!
//! [`build_plan`] turns a difference list into an ordered list of
//! [`SyncOperation`]s. Destructive changes are never planned automatically:
//! local-only indexes stay advisory, and type or requirement changes are
//! routed to manual review by the executor.

use crate::diff::{CollectionDiffKind, CollectionDifference, FieldDiffKind, IndexDiffKind, Priority};
use crate::snapshot::{FieldInfo, FieldType, IndexInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Create a missing collection.
    CreateCollection,
    /// Backfill a missing field.
    AddField,
    /// Change a field's type (manual review).
    ModifyField,
    /// Change a field's required flag (manual review).
    UpdateRequirement,
    /// Create a missing index.
    CreateIndex,
    /// Drop an index (manual review; never planned automatically).
    DropIndex,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::CreateCollection => "create_collection",
            OperationKind::AddField => "add_field",
            OperationKind::ModifyField => "modify_field",
            OperationKind::UpdateRequirement => "update_requirement",
            OperationKind::CreateIndex => "create_index",
            OperationKind::DropIndex => "drop_index",
        };
        f.write_str(name)
    }
}

/// Typed payload of a sync operation, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum OperationDetails {
    /// Create a missing collection.
    CreateCollection,
    /// Backfill a missing field on existing documents.
    AddField {
        /// Declared field type.
        field_type: FieldType,
        /// Whether the field holds an array.
        is_array: bool,
        /// Whether the field is required.
        is_required: bool,
        /// Declared default value, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        default_value: Option<Value>,
    },
    /// Change a field's type. Requires manual resolution.
    ModifyField {
        /// Reference-side shape.
        reference: FieldInfo,
        /// Local-side shape.
        local: FieldInfo,
    },
    /// Change a field's required flag. Requires manual resolution.
    UpdateRequirement {
        /// Required flag in the reference.
        reference_required: bool,
        /// Required flag locally.
        local_required: bool,
    },
    /// Create a missing index.
    CreateIndex {
        /// Full target index definition.
        index: IndexInfo,
    },
    /// Drop an index. Requires manual resolution.
    DropIndex {
        /// Index to drop.
        index: IndexInfo,
    },
}

/// One step of a sync plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    /// Target collection.
    pub collection: String,
    /// Target field, for field-level operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Target index, for index-level operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Priority inherited from the originating difference.
    pub priority: Priority,
    /// Rendered, human-readable form of the underlying database command.
    /// Diagnostic only, never executed as-is.
    pub command_description: String,
    /// Typed operation payload.
    pub details: OperationDetails,
}

impl SyncOperation {
    /// Kind of this operation.
    pub fn kind(&self) -> OperationKind {
        match self.details {
            OperationDetails::CreateCollection => OperationKind::CreateCollection,
            OperationDetails::AddField { .. } => OperationKind::AddField,
            OperationDetails::ModifyField { .. } => OperationKind::ModifyField,
            OperationDetails::UpdateRequirement { .. } => OperationKind::UpdateRequirement,
            OperationDetails::CreateIndex { .. } => OperationKind::CreateIndex,
            OperationDetails::DropIndex { .. } => OperationKind::DropIndex,
        }
    }

    /// Creates a collection-creation operation.
    pub fn create_collection(collection: impl Into<String>, priority: Priority) -> Self {
        let collection = collection.into();
        Self {
            command_description: format!("db.createCollection(\"{}\")", collection),
            collection,
            field: None,
            index: None,
            priority,
            details: OperationDetails::CreateCollection,
        }
    }

    /// Creates a field-backfill operation from the reference field shape.
    pub fn add_field(
        collection: impl Into<String>,
        field: impl Into<String>,
        info: &FieldInfo,
        priority: Priority,
    ) -> Self {
        let collection = collection.into();
        let field = field.into();
        let default_value = if info.has_default {
            info.default_value.clone()
        } else {
            None
        };
        let rendered_default = default_value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| format!("<default {}>", info.type_label()));
        Self {
            command_description: format!(
                "db.{}.updateMany({{ \"{}\": {{ \"$exists\": false }} }}, {{ \"$set\": {{ \"{}\": {} }} }})",
                collection, field, field, rendered_default
            ),
            collection,
            field: Some(field),
            index: None,
            priority,
            details: OperationDetails::AddField {
                field_type: info.field_type,
                is_array: info.is_array,
                is_required: info.is_required,
                default_value,
            },
        }
    }

    /// Creates a type-change operation. Routed to manual review.
    pub fn modify_field(
        collection: impl Into<String>,
        field: impl Into<String>,
        reference: &FieldInfo,
        local: &FieldInfo,
        priority: Priority,
    ) -> Self {
        let collection = collection.into();
        let field = field.into();
        Self {
            command_description: format!(
                "manual migration required: {}.{} type {} -> {}",
                collection,
                field,
                local.type_label(),
                reference.type_label()
            ),
            collection,
            field: Some(field),
            index: None,
            priority,
            details: OperationDetails::ModifyField {
                reference: reference.clone(),
                local: local.clone(),
            },
        }
    }

    /// Creates a requirement-change operation. Routed to manual review.
    pub fn update_requirement(
        collection: impl Into<String>,
        field: impl Into<String>,
        reference_required: bool,
        local_required: bool,
        priority: Priority,
    ) -> Self {
        let collection = collection.into();
        let field = field.into();
        Self {
            command_description: format!(
                "manual review required: {}.{} required {} -> {}",
                collection, field, local_required, reference_required
            ),
            collection,
            field: Some(field),
            index: None,
            priority,
            details: OperationDetails::UpdateRequirement {
                reference_required,
                local_required,
            },
        }
    }

    /// Creates an index-creation operation from the full target definition.
    pub fn create_index(collection: impl Into<String>, index: &IndexInfo, priority: Priority) -> Self {
        let collection = collection.into();
        let mut opts = vec![format!("\"name\": \"{}\"", index.name)];
        if index.unique {
            opts.push("\"unique\": true".into());
        }
        if index.sparse {
            opts.push("\"sparse\": true".into());
        }
        if index.background {
            opts.push("\"background\": true".into());
        }
        Self {
            command_description: format!(
                "db.{}.createIndex({}, {{ {} }})",
                collection,
                index.key_spec(),
                opts.join(", ")
            ),
            collection,
            field: None,
            index: Some(index.name.clone()),
            priority,
            details: OperationDetails::CreateIndex {
                index: index.clone(),
            },
        }
    }

    /// Creates an index-drop operation. Never planned automatically and
    /// routed to manual review by the executor.
    pub fn drop_index(collection: impl Into<String>, index: &IndexInfo, priority: Priority) -> Self {
        let collection = collection.into();
        Self {
            command_description: format!("db.{}.dropIndex(\"{}\")", collection, index.name),
            collection,
            field: None,
            index: Some(index.name.clone()),
            priority,
            details: OperationDetails::DropIndex {
                index: index.clone(),
            },
        }
    }
}

/// Derives an ordered sync plan from a difference list.
///
/// The output is stable-sorted by priority; operations of equal priority keep
/// the order in which their differences were discovered (collection, then
/// field, then index), so identical inputs yield identical plans.
pub fn build_plan(differences: &[CollectionDifference]) -> Vec<SyncOperation> {
    let mut plan = Vec::new();

    for difference in differences {
        match difference.kind {
            CollectionDiffKind::Missing => {
                plan.push(SyncOperation::create_collection(
                    &difference.collection,
                    difference.priority,
                ));
            }
            // Local-only collections are advisory; nothing to execute.
            CollectionDiffKind::Added => {}
            CollectionDiffKind::Modified => {
                for field_diff in &difference.field_differences {
                    match field_diff.kind {
                        FieldDiffKind::Missing => {
                            if let Some(reference) = &field_diff.reference {
                                plan.push(SyncOperation::add_field(
                                    &difference.collection,
                                    &field_diff.field,
                                    reference,
                                    field_diff.priority,
                                ));
                            }
                        }
                        FieldDiffKind::TypeMismatch => {
                            if let (Some(reference), Some(local)) =
                                (&field_diff.reference, &field_diff.local)
                            {
                                plan.push(SyncOperation::modify_field(
                                    &difference.collection,
                                    &field_diff.field,
                                    reference,
                                    local,
                                    field_diff.priority,
                                ));
                            }
                        }
                        FieldDiffKind::RequirementMismatch => {
                            if let (Some(reference), Some(local)) =
                                (&field_diff.reference, &field_diff.local)
                            {
                                plan.push(SyncOperation::update_requirement(
                                    &difference.collection,
                                    &field_diff.field,
                                    reference.is_required,
                                    local.is_required,
                                    field_diff.priority,
                                ));
                            }
                        }
                        // Local-only fields are advisory.
                        FieldDiffKind::Added => {}
                    }
                }
                for index_diff in &difference.index_differences {
                    match index_diff.kind {
                        IndexDiffKind::Missing => {
                            if let Some(reference) = &index_diff.reference {
                                plan.push(SyncOperation::create_index(
                                    &difference.collection,
                                    reference,
                                    index_diff.priority,
                                ));
                            }
                        }
                        // Local-only indexes are never dropped automatically;
                        // key and option drift stay advisory.
                        IndexDiffKind::Added
                        | IndexDiffKind::KeyMismatch
                        | IndexDiffKind::OptionMismatch => {}
                    }
                }
            }
        }
    }

    // sort_by_key is stable: equal priorities keep discovery order.
    plan.sort_by_key(|operation| operation.priority);

    tracing::debug!(operations = plan.len(), "sync plan built");
    plan
}
