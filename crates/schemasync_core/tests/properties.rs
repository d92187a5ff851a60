//! Property tests for the differ and plan builder.

use proptest::prelude::*;
use schemasync_core::{
    build_plan, compare, CollectionDiffKind, CollectionSchema, DatabaseSchema, FieldInfo,
    FieldType, IndexInfo, IndexKey,
};
use std::collections::BTreeSet;

fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::String),
        Just(FieldType::Number),
        Just(FieldType::Boolean),
        Just(FieldType::Object),
        Just(FieldType::Array),
        Just(FieldType::Date),
        Just(FieldType::Mixed),
    ]
}

fn field_info_strategy() -> impl Strategy<Value = FieldInfo> {
    (field_type_strategy(), any::<bool>(), any::<bool>()).prop_map(|(field_type, is_array, is_required)| {
        let mut info = FieldInfo::new(field_type);
        info.is_array = is_array;
        info.is_required = is_required;
        info
    })
}

fn index_strategy(name: &'static str) -> impl Strategy<Value = IndexInfo> {
    (
        prop::sample::select(vec!["email", "name", "createdAt"]),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(move |(field, descending, unique, sparse)| {
            let key = if descending {
                IndexKey::desc(field)
            } else {
                IndexKey::asc(field)
            };
            IndexInfo::new(name, vec![key])
                .with_unique(unique)
                .with_sparse(sparse)
        })
}

fn collection_strategy(name: &'static str) -> impl Strategy<Value = CollectionSchema> {
    (
        prop::collection::btree_map(
            prop::sample::select(vec!["email", "age", "nickname", "tags"]),
            field_info_strategy(),
            0..4,
        ),
        prop::option::of(index_strategy("idx_main")),
        0u64..50,
    )
        .prop_map(move |(fields, index, document_count)| {
            let mut collection = CollectionSchema::new(name).with_document_count(document_count);
            for (field, info) in fields {
                collection = collection.with_field(field, info);
            }
            if let Some(index) = index {
                collection = collection.with_index(index);
            }
            collection
        })
}

fn schema_strategy() -> impl Strategy<Value = DatabaseSchema> {
    (
        prop::option::of(collection_strategy("users")),
        prop::option::of(collection_strategy("orders")),
        prop::option::of(collection_strategy("items")),
    )
        .prop_map(|(users, orders, items)| {
            let mut schema = DatabaseSchema::new("app");
            for collection in [users, orders, items].into_iter().flatten() {
                schema = schema.with_collection(collection);
            }
            schema
        })
}

proptest! {
    #[test]
    fn compare_with_self_is_empty(schema in schema_strategy()) {
        prop_assert!(compare(&schema, &schema.clone()).is_empty());
    }

    #[test]
    fn compare_is_deterministic(a in schema_strategy(), b in schema_strategy()) {
        let first = serde_json::to_string(&compare(&a, &b)).unwrap();
        let second = serde_json::to_string(&compare(&a, &b)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn missing_and_added_mirror_under_swap(a in schema_strategy(), b in schema_strategy()) {
        let forward = compare(&a, &b);
        let backward = compare(&b, &a);

        let missing_forward: BTreeSet<&str> = forward
            .iter()
            .filter(|d| d.kind == CollectionDiffKind::Missing)
            .map(|d| d.collection.as_str())
            .collect();
        let added_backward: BTreeSet<&str> = backward
            .iter()
            .filter(|d| d.kind == CollectionDiffKind::Added)
            .map(|d| d.collection.as_str())
            .collect();
        prop_assert_eq!(missing_forward, added_backward);

        // Modified collections are reported from both directions.
        let modified_forward: BTreeSet<&str> = forward
            .iter()
            .filter(|d| d.kind == CollectionDiffKind::Modified)
            .map(|d| d.collection.as_str())
            .collect();
        let modified_backward: BTreeSet<&str> = backward
            .iter()
            .filter(|d| d.kind == CollectionDiffKind::Modified)
            .map(|d| d.collection.as_str())
            .collect();
        prop_assert_eq!(modified_forward, modified_backward);
    }

    #[test]
    fn plan_never_violates_priority_order(a in schema_strategy(), b in schema_strategy()) {
        let plan = build_plan(&compare(&a, &b));
        for pair in plan.windows(2) {
            prop_assert!(pair[0].priority <= pair[1].priority);
        }
    }

    #[test]
    fn plan_is_deterministic(a in schema_strategy(), b in schema_strategy()) {
        let first = serde_json::to_string(&build_plan(&compare(&a, &b))).unwrap();
        let second = serde_json::to_string(&build_plan(&compare(&a, &b))).unwrap();
        prop_assert_eq!(first, second);
    }
}
