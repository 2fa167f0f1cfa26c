//! Immutable type graph and its builder.

use crate::field::{Field, PostProcessor};
use crate::types::{ScalarKind, TypeKey, TypeKind};
use conflux_shared::{ErrorCode, ErrorEnvelope};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Malformed-schema failures raised while walking the type map.
///
/// These signal a bug in the schema declaration layer, never a user input
/// problem, and are fatal to the whole operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A node references a type key absent from the type map.
    DanglingTypeKey {
        /// The missing key.
        referenced: TypeKey,
        /// Key of the node holding the reference.
        from: TypeKey,
    },
    /// The requested root key is absent from the type map.
    UnknownRootKey {
        /// The missing root key.
        root: TypeKey,
    },
}

impl SchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::DanglingTypeKey { .. } => ErrorCode::new("schema", "dangling_type_key"),
            Self::UnknownRootKey { .. } => ErrorCode::new("schema", "unknown_root_key"),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingTypeKey { referenced, from } => write!(
                formatter,
                "type key {referenced} referenced from {from} is missing from the type map"
            ),
            Self::UnknownRootKey { root } => {
                write!(formatter, "root type key {root} is missing from the type map")
            },
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<SchemaError> for ErrorEnvelope {
    fn from(error: SchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::invariant(code, message);

        match error {
            SchemaError::DanglingTypeKey { referenced, from } => envelope
                .with_metadata("referenced", referenced.to_string())
                .with_metadata("from", from.to_string()),
            SchemaError::UnknownRootKey { root } => {
                envelope.with_metadata("root", root.to_string())
            },
        }
    }
}

/// Immutable map of structural keys to live type nodes, plus the per-type
/// post-processing hook registry.
///
/// Built once per schema declaration by [`GraphBuilder`]; never mutated
/// afterwards, so traversals may share it across threads freely.
pub struct TypeGraph {
    nodes: BTreeMap<TypeKey, TypeKind>,
    post_processors: BTreeMap<TypeKey, Arc<dyn PostProcessor>>,
}

impl TypeGraph {
    /// Look up a live node by key.
    #[must_use]
    pub fn get(&self, key: &TypeKey) -> Option<&TypeKind> {
        self.nodes.get(key)
    }

    /// Returns true when the key exists in the type map.
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Registered post-processing hook for a type, if any.
    #[must_use]
    pub fn post_processor(&self, key: &TypeKey) -> Option<&Arc<dyn PostProcessor>> {
        self.post_processors.get(key)
    }

    /// Number of nodes in the type map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the type map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every key reachable from `root` by key lookup, including `root`.
    ///
    /// Terminates because the type map is finite and recursion only goes
    /// through named keys. Fails on the first dangling reference.
    pub fn reachable_from(&self, root: &TypeKey) -> Result<BTreeSet<TypeKey>, SchemaError> {
        if !self.contains(root) {
            return Err(SchemaError::UnknownRootKey { root: root.clone() });
        }

        let mut reachable = BTreeSet::new();
        let mut worklist = vec![root.clone()];

        while let Some(key) = worklist.pop() {
            if !reachable.insert(key.clone()) {
                continue;
            }
            let node = self
                .get(&key)
                .ok_or_else(|| SchemaError::UnknownRootKey { root: key.clone() })?;

            for child in child_keys(node) {
                if !self.contains(child) {
                    return Err(SchemaError::DanglingTypeKey {
                        referenced: child.clone(),
                        from: key.clone(),
                    });
                }
                if !reachable.contains(child) {
                    worklist.push(child.clone());
                }
            }
        }

        Ok(reachable)
    }
}

impl fmt::Debug for TypeGraph {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TypeGraph")
            .field("keys", &self.nodes.keys().collect::<Vec<_>>())
            .field("post_processors", &self.post_processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Keys directly referenced by a node.
fn child_keys(node: &TypeKind) -> Vec<&TypeKey> {
    match node {
        TypeKind::Scalar(_) => Vec::new(),
        TypeKind::Array { inner } | TypeKind::Nullable { inner } => vec![inner],
        TypeKind::Map { value, .. } => vec![value],
        TypeKind::Selector { fields } | TypeKind::Shape { fields } => {
            fields.iter().map(Field::type_key).collect()
        },
    }
}

/// Thin declaration layer producing an immutable [`TypeGraph`].
///
/// Interning is structural: declaring an identical node twice returns the
/// existing key without inserting a duplicate.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<TypeKey, TypeKind>,
    post_processors: BTreeMap<TypeKey, Arc<dyn PostProcessor>>,
}

impl GraphBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, node: TypeKind) -> TypeKey {
        let key = node.derive_key();
        self.nodes.entry(key.clone()).or_insert(node);
        key
    }

    /// Declare a scalar leaf.
    pub fn scalar(&mut self, kind: ScalarKind) -> TypeKey {
        self.intern(TypeKind::Scalar(kind))
    }

    /// Declare an array of a previously declared inner type.
    pub fn array(&mut self, inner: TypeKey) -> TypeKey {
        self.intern(TypeKind::Array { inner })
    }

    /// Declare a nullable wrapper around a previously declared inner type.
    pub fn nullable(&mut self, inner: TypeKey) -> TypeKey {
        self.intern(TypeKind::Nullable { inner })
    }

    /// Declare a map with fixed-kind keys and a previously declared value
    /// type.
    pub fn map(&mut self, key_kind: ScalarKind, value: TypeKey) -> TypeKey {
        self.intern(TypeKind::Map { key_kind, value })
    }

    /// Declare a shape with the given fields, in declaration order.
    pub fn shape(&mut self, fields: Vec<Field>) -> TypeKey {
        self.intern(TypeKind::Shape { fields })
    }

    /// Declare a selector with the given branches, in declaration order.
    pub fn selector(&mut self, fields: Vec<Field>) -> TypeKey {
        self.intern(TypeKind::Selector { fields })
    }

    /// Register a post-processing hook for a declared type.
    pub fn post_process(&mut self, key: &TypeKey, hook: Arc<dyn PostProcessor>) {
        self.post_processors.insert(key.clone(), hook);
    }

    /// Freeze the builder into an immutable graph.
    #[must_use]
    pub fn finish(self) -> TypeGraph {
        TypeGraph {
            nodes: self.nodes,
            post_processors: self.post_processors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PostProcessError;
    use serde_json::Value;

    struct Passthrough;

    impl PostProcessor for Passthrough {
        fn post_process(&self, value: Value, _path: &str) -> Result<Value, PostProcessError> {
            Ok(value)
        }
    }

    #[test]
    fn identical_declarations_intern_to_one_node() {
        let mut builder = GraphBuilder::new();
        let int = builder.scalar(ScalarKind::Int);
        let first = builder.shape(vec![Field::required("a", int.clone())]);
        let second = builder.shape(vec![Field::required("a", int)]);

        assert_eq!(first, second);
        // Scalar node plus one shape node.
        assert_eq!(builder.finish().len(), 2);
    }

    #[test]
    fn reachability_covers_every_referenced_node() -> Result<(), SchemaError> {
        let mut builder = GraphBuilder::new();
        let int = builder.scalar(ScalarKind::Int);
        let array = builder.array(int.clone());
        let nullable = builder.nullable(array.clone());
        let root = builder.shape(vec![
            Field::required("values", nullable.clone()),
            Field::optional("count", int.clone()),
        ]);
        let graph = builder.finish();

        let reachable = graph.reachable_from(&root)?;
        assert_eq!(reachable.len(), 4);
        assert!(reachable.contains(&int));
        assert!(reachable.contains(&array));
        assert!(reachable.contains(&nullable));
        assert!(reachable.contains(&root));
        Ok(())
    }

    #[test]
    fn dangling_reference_is_a_schema_error() {
        let mut builder = GraphBuilder::new();
        let phantom = TypeKey::new("Scalar.Int");
        let root = builder.shape(vec![Field::required("a", phantom.clone())]);
        let graph = builder.finish();

        let result = graph.reachable_from(&root);
        assert_eq!(
            result,
            Err(SchemaError::DanglingTypeKey {
                referenced: phantom,
                from: root,
            })
        );
    }

    #[test]
    fn unknown_root_is_a_schema_error() {
        let graph = GraphBuilder::new().finish();
        let root = TypeKey::new("Scalar.Int");

        let result = graph.reachable_from(&root);
        assert_eq!(result, Err(SchemaError::UnknownRootKey { root }));
    }

    #[test]
    fn post_processors_are_registered_per_key() {
        let mut builder = GraphBuilder::new();
        let int = builder.scalar(ScalarKind::Int);
        let string = builder.scalar(ScalarKind::String);
        builder.post_process(&int, Arc::new(Passthrough));
        let graph = builder.finish();

        assert!(graph.post_processor(&int).is_some());
        assert!(graph.post_processor(&string).is_none());
    }

    #[test]
    fn schema_error_converts_to_invariant_envelope() {
        let error = SchemaError::UnknownRootKey {
            root: TypeKey::new("Shape.missing"),
        };
        let envelope = ErrorEnvelope::from(error);

        assert!(envelope.is_invariant());
        assert_eq!(
            envelope.metadata.get("root").map(String::as_str),
            Some("Shape.missing")
        );
    }
}
