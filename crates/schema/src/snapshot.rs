//! Serializable schema snapshot and one-pass conversion from the live graph.
//!
//! The snapshot is the sole artifact that crosses process boundaries: a
//! flattened table of data-only descriptors with no live behavior. Default
//! producers cannot be serialized, so only default literals survive the
//! conversion.

use crate::graph::{SchemaError, TypeGraph};
use crate::types::{ScalarKind, TypeKey, TypeKind};
use conflux_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Data-only mirror of a live node's kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapKind {
    /// Scalar leaf.
    Scalar,
    /// Homogeneous sequence.
    Array,
    /// Nullable wrapper.
    Nullable,
    /// Fixed-key-kind mapping.
    Map,
    /// Exactly-one-of composite.
    Selector,
    /// Record composite.
    Shape,
}

impl SnapKind {
    /// Lowercase kind name for messages and metadata.
    #[must_use]
    pub const fn kind_name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Array => "array",
            Self::Nullable => "nullable",
            Self::Map => "map",
            Self::Selector => "selector",
            Self::Shape => "shape",
        }
    }
}

/// Serializable mirror of a declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnap {
    /// Field name as it appears in raw input.
    pub name: String,
    /// Structural key of the declared field type.
    pub type_key: TypeKey,
    /// Whether the field must be present in raw input.
    pub is_required: bool,
    /// Whether a serializable default literal was captured. Producer
    /// defaults are not serializable and erase entirely: this is false for
    /// them even though the live field declares a default.
    pub has_default: bool,
    /// The default literal, present exactly when `has_default` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_literal: Option<Value>,
}

/// Serializable mirror of a live type node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSnap {
    /// Structural key of the mirrored node.
    pub key: TypeKey,
    /// Kind tag.
    pub kind: SnapKind,
    /// Primitive kind for scalar snaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar_kind: Option<ScalarKind>,
    /// Inner type key for arrays, nullables, and map values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_type_key: Option<TypeKey>,
    /// Key kind for map snaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_kind: Option<ScalarKind>,
    /// Declared fields for composite snaps, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldSnap>>,
}

impl TypeSnap {
    /// Look up a declared field snap by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSnap> {
        self.fields
            .as_deref()
            .and_then(|fields| fields.iter().find(|field| field.name == name))
    }
}

/// Flattened, serializable table of every type snap reachable from a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    root_key: TypeKey,
    snaps: BTreeMap<TypeKey, TypeSnap>,
}

impl SchemaSnapshot {
    /// Convert the reachable set of a live graph into a snapshot.
    ///
    /// Fails only when a referenced key is missing from the type map, which
    /// signals a malformed schema definition.
    pub fn from_graph(graph: &TypeGraph, root: &TypeKey) -> Result<Self, SchemaError> {
        let reachable = graph.reachable_from(root)?;
        let mut snaps = BTreeMap::new();

        for key in reachable {
            let node = graph
                .get(&key)
                .ok_or_else(|| SchemaError::UnknownRootKey { root: key.clone() })?;
            snaps.insert(key.clone(), snap_from_node(key, node));
        }

        tracing::debug!(root = %root, types = snaps.len(), "built schema snapshot");

        Ok(Self {
            root_key: root.clone(),
            snaps,
        })
    }

    /// Key of the snapshot root.
    #[must_use]
    pub const fn root_key(&self) -> &TypeKey {
        &self.root_key
    }

    /// Look up a type snap by key.
    #[must_use]
    pub fn get_snap(&self, key: &TypeKey) -> Option<&TypeSnap> {
        self.snaps.get(key)
    }

    /// Returns true when the key exists in the snapshot.
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.snaps.contains_key(key)
    }

    /// Number of snaps in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snaps.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snaps.is_empty()
    }

    /// Iterate over every key in the table.
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.snaps.keys()
    }

    /// Serialize the snapshot to JSON for cross-boundary transport.
    pub fn to_json(&self) -> Result<String, ErrorEnvelope> {
        serde_json::to_string(self).map_err(|error| {
            ErrorEnvelope::invariant(
                ErrorCode::internal(),
                format!("failed to serialize schema snapshot: {error}"),
            )
        })
    }

    /// Parse a snapshot from its JSON transport form.
    pub fn from_json(input: &str) -> Result<Self, ErrorEnvelope> {
        serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("schema", "invalid_snapshot_json"),
                format!("invalid schema snapshot JSON: {error}"),
            )
        })
    }
}

/// Mirror a single live node into its data-only descriptor.
fn snap_from_node(key: TypeKey, node: &TypeKind) -> TypeSnap {
    match node {
        TypeKind::Scalar(kind) => TypeSnap {
            key,
            kind: SnapKind::Scalar,
            scalar_kind: Some(*kind),
            inner_type_key: None,
            key_kind: None,
            fields: None,
        },
        TypeKind::Array { inner } => TypeSnap {
            key,
            kind: SnapKind::Array,
            scalar_kind: None,
            inner_type_key: Some(inner.clone()),
            key_kind: None,
            fields: None,
        },
        TypeKind::Nullable { inner } => TypeSnap {
            key,
            kind: SnapKind::Nullable,
            scalar_kind: None,
            inner_type_key: Some(inner.clone()),
            key_kind: None,
            fields: None,
        },
        TypeKind::Map { key_kind, value } => TypeSnap {
            key,
            kind: SnapKind::Map,
            scalar_kind: None,
            inner_type_key: Some(value.clone()),
            key_kind: Some(*key_kind),
            fields: None,
        },
        TypeKind::Selector { fields } => TypeSnap {
            key,
            kind: SnapKind::Selector,
            scalar_kind: None,
            inner_type_key: None,
            key_kind: None,
            fields: Some(fields.iter().map(field_snap).collect()),
        },
        TypeKind::Shape { fields } => TypeSnap {
            key,
            kind: SnapKind::Shape,
            scalar_kind: None,
            inner_type_key: None,
            key_kind: None,
            fields: Some(fields.iter().map(field_snap).collect()),
        },
    }
}

fn field_snap(field: &crate::field::Field) -> FieldSnap {
    let default_literal = field.default().and_then(|default| default.literal().cloned());
    FieldSnap {
        name: field.name().to_string(),
        type_key: field.type_key().clone(),
        is_required: field.is_required(),
        has_default: default_literal.is_some(),
        default_literal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{DefaultProducer, Field};
    use crate::graph::GraphBuilder;
    use serde_json::json;
    use std::sync::Arc;

    struct ProducedString;

    impl DefaultProducer for ProducedString {
        fn produce(&self) -> Value {
            json!("produced")
        }
    }

    fn sample_graph() -> (TypeGraph, TypeKey) {
        let mut builder = GraphBuilder::new();
        let int = builder.scalar(ScalarKind::Int);
        let string = builder.scalar(ScalarKind::String);
        let array = builder.array(int.clone());
        let root = builder.shape(vec![
            Field::required("counts", array),
            Field::with_default("limit", int, json!(10)),
            Field::with_producer("label", string, Arc::new(ProducedString)),
        ]);
        (builder.finish(), root)
    }

    #[test]
    fn conversion_mirrors_the_reachable_set() -> Result<(), SchemaError> {
        let (graph, root) = sample_graph();
        let snapshot = SchemaSnapshot::from_graph(&graph, &root)?;

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.root_key(), &root);

        let root_snap = snapshot.get_snap(&root);
        let fields = root_snap.and_then(|snap| snap.fields.as_deref());
        let names: Vec<&str> = fields
            .map(|fields| fields.iter().map(|field| field.name.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(names, vec!["counts", "limit", "label"]);
        Ok(())
    }

    #[test]
    fn literal_defaults_are_captured_and_producers_erased() -> Result<(), SchemaError> {
        let (graph, root) = sample_graph();
        let snapshot = SchemaSnapshot::from_graph(&graph, &root)?;
        let root_snap = snapshot
            .get_snap(&root)
            .ok_or_else(|| SchemaError::UnknownRootKey { root: root.clone() })?;

        let limit = root_snap.field("limit");
        assert_eq!(limit.map(|field| field.has_default), Some(true));
        assert_eq!(
            limit.and_then(|field| field.default_literal.clone()),
            Some(json!(10))
        );

        // Producer defaults erase entirely from the snapshot.
        let label = root_snap.field("label");
        assert_eq!(label.map(|field| field.has_default), Some(false));
        assert_eq!(label.and_then(|field| field.default_literal.clone()), None);
        Ok(())
    }

    #[test]
    fn scalar_snaps_carry_their_kind() -> Result<(), SchemaError> {
        let (graph, root) = sample_graph();
        let snapshot = SchemaSnapshot::from_graph(&graph, &root)?;
        let int_snap = snapshot.get_snap(&ScalarKind::Int.type_key());

        assert_eq!(int_snap.map(|snap| snap.kind), Some(SnapKind::Scalar));
        assert_eq!(
            int_snap.and_then(|snap| snap.scalar_kind),
            Some(ScalarKind::Int)
        );
        Ok(())
    }

    #[test]
    fn map_snaps_carry_key_kind_and_value_key() -> Result<(), SchemaError> {
        let mut builder = GraphBuilder::new();
        let float = builder.scalar(ScalarKind::Float);
        let map = builder.map(ScalarKind::String, float.clone());
        let graph = builder.finish();

        let snapshot = SchemaSnapshot::from_graph(&graph, &map)?;
        let map_snap = snapshot
            .get_snap(&map)
            .ok_or_else(|| SchemaError::UnknownRootKey { root: map.clone() })?;

        assert_eq!(map_snap.kind, SnapKind::Map);
        assert_eq!(map_snap.key_kind, Some(ScalarKind::String));
        assert_eq!(map_snap.inner_type_key.as_ref(), Some(&float));
        Ok(())
    }
}
