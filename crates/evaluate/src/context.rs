//! Immutable traversal contexts with pure descend operations.
//!
//! A [`SnapshotContext`] binds a schema snapshot, the current type snap, and
//! the evaluation stack; it is all the validator needs and works without the
//! live graph, so snapshot-only consumers (remote tooling) can validate.
//!
//! A [`TraversalContext`] additionally carries the live node, the full live
//! graph, and the traversal mode, which the resolver needs to execute live
//! behavior (default producers, post-processing hooks). Every descend
//! re-derives the live node in lock-step with the snapshot entry; drift
//! between the two is a fatal [`ConsistencyError`].

use crate::errors::ConsistencyError;
use crate::stack::EvaluationStack;
use conflux_schema::{FieldSnap, SchemaSnapshot, SnapKind, TypeGraph, TypeKey, TypeKind, TypeSnap};

/// Traversal modes of the recursive validator/resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// Accumulate findings only; no output tree.
    Validate,
    /// Accumulate findings and produce a resolved output tree with defaults
    /// filled in.
    ResolveDefaults,
    /// As `ResolveDefaults`, plus per-type post-processing hooks.
    ResolveDefaultsAndPostprocess,
}

impl TraversalMode {
    /// Returns true when the mode produces a resolved output tree.
    #[must_use]
    pub const fn resolves_defaults(self) -> bool {
        matches!(self, Self::ResolveDefaults | Self::ResolveDefaultsAndPostprocess)
    }

    /// Returns true when the mode invokes post-processing hooks.
    #[must_use]
    pub const fn post_processes(self) -> bool {
        matches!(self, Self::ResolveDefaultsAndPostprocess)
    }
}

/// Snapshot-only traversal context.
#[derive(Debug, Clone)]
pub struct SnapshotContext<'a> {
    snapshot: &'a SchemaSnapshot,
    snap: &'a TypeSnap,
    stack: EvaluationStack,
}

impl<'a> SnapshotContext<'a> {
    /// Bind the snapshot root with an empty stack.
    pub fn for_root(snapshot: &'a SchemaSnapshot) -> Result<Self, ConsistencyError> {
        let root = snapshot.root_key();
        let snap = snapshot
            .get_snap(root)
            .ok_or_else(|| ConsistencyError::MissingSnapshotEntry {
                key: root.clone(),
                at: "root".to_string(),
            })?;
        Ok(Self {
            snapshot,
            snap,
            stack: EvaluationStack::root(),
        })
    }

    /// The shared schema snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &'a SchemaSnapshot {
        self.snapshot
    }

    /// The current type snap.
    #[must_use]
    pub const fn snap(&self) -> &'a TypeSnap {
        self.snap
    }

    /// Key of the current type.
    #[must_use]
    pub const fn type_key(&self) -> &'a TypeKey {
        &self.snap.key
    }

    /// The evaluation stack at this position.
    #[must_use]
    pub const fn stack(&self) -> &EvaluationStack {
        &self.stack
    }

    fn rebind(&self, key: &TypeKey, stack: EvaluationStack) -> Result<Self, ConsistencyError> {
        let snap = self
            .snapshot
            .get_snap(key)
            .ok_or_else(|| ConsistencyError::MissingSnapshotEntry {
                key: key.clone(),
                at: stack.render(),
            })?;
        Ok(Self {
            snapshot: self.snapshot,
            snap,
            stack,
        })
    }

    fn require_kind(&self, expected: &'static str, accepted: &[SnapKind]) -> Result<(), ConsistencyError> {
        if accepted.contains(&self.snap.kind) {
            Ok(())
        } else {
            Err(ConsistencyError::KindMismatch {
                key: self.snap.key.clone(),
                expected,
                actual: self.snap.kind.kind_name(),
                at: self.stack.render(),
            })
        }
    }

    fn inner_type_key(&self) -> Result<&'a TypeKey, ConsistencyError> {
        self.snap
            .inner_type_key
            .as_ref()
            .ok_or_else(|| ConsistencyError::SnapshotDrift {
                key: self.snap.key.clone(),
                detail: "snap is missing its inner type key".to_string(),
                at: self.stack.render(),
            })
    }

    /// Descend into a declared field of a shape or selector.
    pub fn for_field(&self, field: &FieldSnap) -> Result<Self, ConsistencyError> {
        self.require_kind("shape or selector", &[SnapKind::Shape, SnapKind::Selector])?;
        self.rebind(&field.type_key, self.stack.for_field(&field.name))
    }

    /// Descend into an array element.
    pub fn for_array_index(&self, index: usize) -> Result<Self, ConsistencyError> {
        self.require_kind("array", &[SnapKind::Array])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.for_array_index(index))
    }

    /// Descend through a nullable wrapper. Transparent to path reporting.
    pub fn for_nullable_inner(&self) -> Result<Self, ConsistencyError> {
        self.require_kind("nullable", &[SnapKind::Nullable])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.clone())
    }

    /// Rebind to an arbitrary key within the same snapshot, stack unchanged.
    pub fn for_new_type(&self, key: &TypeKey) -> Result<Self, ConsistencyError> {
        self.rebind(key, self.stack.clone())
    }

    /// Descend into a map value with a synthetic field entry for the key.
    pub fn for_map_value(&self, key_text: &str) -> Result<Self, ConsistencyError> {
        self.require_kind("map", &[SnapKind::Map])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.for_field(key_text))
    }
}

/// Mode-aware traversal context carrying live behavior.
pub struct TraversalContext<'a> {
    snapshot: &'a SchemaSnapshot,
    snap: &'a TypeSnap,
    node: &'a TypeKind,
    graph: &'a TypeGraph,
    stack: EvaluationStack,
    mode: TraversalMode,
}

impl<'a> TraversalContext<'a> {
    /// Bind the graph root with an empty stack.
    pub fn for_root(
        graph: &'a TypeGraph,
        snapshot: &'a SchemaSnapshot,
        root: &TypeKey,
        mode: TraversalMode,
    ) -> Result<Self, ConsistencyError> {
        let snap = snapshot
            .get_snap(root)
            .ok_or_else(|| ConsistencyError::MissingSnapshotEntry {
                key: root.clone(),
                at: "root".to_string(),
            })?;
        let node = graph
            .get(root)
            .ok_or_else(|| ConsistencyError::MissingLiveType {
                key: root.clone(),
                at: "root".to_string(),
            })?;
        Ok(Self {
            snapshot,
            snap,
            node,
            graph,
            stack: EvaluationStack::root(),
            mode,
        })
    }

    /// The shared schema snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &'a SchemaSnapshot {
        self.snapshot
    }

    /// The current type snap.
    #[must_use]
    pub const fn snap(&self) -> &'a TypeSnap {
        self.snap
    }

    /// The current live node.
    #[must_use]
    pub const fn node(&self) -> &'a TypeKind {
        self.node
    }

    /// The shared live graph.
    #[must_use]
    pub const fn graph(&self) -> &'a TypeGraph {
        self.graph
    }

    /// Key of the current type.
    #[must_use]
    pub const fn type_key(&self) -> &'a TypeKey {
        &self.snap.key
    }

    /// The evaluation stack at this position.
    #[must_use]
    pub const fn stack(&self) -> &EvaluationStack {
        &self.stack
    }

    /// The active traversal mode.
    #[must_use]
    pub const fn mode(&self) -> TraversalMode {
        self.mode
    }

    /// Returns true when post-processing hooks run in this traversal.
    #[must_use]
    pub const fn do_post_process(&self) -> bool {
        self.mode.post_processes()
    }

    /// Rebind snap and live node together; a key present on one side but
    /// not the other is fatal drift.
    fn rebind(&self, key: &TypeKey, stack: EvaluationStack) -> Result<Self, ConsistencyError> {
        let snap = self
            .snapshot
            .get_snap(key)
            .ok_or_else(|| ConsistencyError::MissingSnapshotEntry {
                key: key.clone(),
                at: stack.render(),
            })?;
        let node = self
            .graph
            .get(key)
            .ok_or_else(|| ConsistencyError::MissingLiveType {
                key: key.clone(),
                at: stack.render(),
            })?;
        Ok(Self {
            snapshot: self.snapshot,
            snap,
            node,
            graph: self.graph,
            stack,
            mode: self.mode,
        })
    }

    fn require_kind(&self, expected: &'static str, accepted: &[SnapKind]) -> Result<(), ConsistencyError> {
        if accepted.contains(&self.snap.kind) {
            Ok(())
        } else {
            Err(ConsistencyError::KindMismatch {
                key: self.snap.key.clone(),
                expected,
                actual: self.snap.kind.kind_name(),
                at: self.stack.render(),
            })
        }
    }

    fn inner_type_key(&self) -> Result<&'a TypeKey, ConsistencyError> {
        let snap_inner = self.snap.inner_type_key.as_ref();
        let live_inner = self.node.inner_key();
        match (snap_inner, live_inner) {
            (Some(snap_inner), Some(live_inner)) if snap_inner == live_inner => Ok(snap_inner),
            (Some(_), Some(_)) => Err(ConsistencyError::SnapshotDrift {
                key: self.snap.key.clone(),
                detail: "snapshot and live graph disagree about the inner type key".to_string(),
                at: self.stack.render(),
            }),
            _ => Err(ConsistencyError::SnapshotDrift {
                key: self.snap.key.clone(),
                detail: "snap is missing its inner type key".to_string(),
                at: self.stack.render(),
            }),
        }
    }

    /// Descend into a declared field of a shape or selector.
    pub fn for_field(&self, field: &FieldSnap) -> Result<Self, ConsistencyError> {
        self.require_kind("shape or selector", &[SnapKind::Shape, SnapKind::Selector])?;
        let live_field = self.node.field(&field.name).ok_or_else(|| {
            ConsistencyError::SnapshotDrift {
                key: self.snap.key.clone(),
                detail: format!("field {} exists in snapshot but not in live graph", field.name),
                at: self.stack.render(),
            }
        })?;
        if live_field.type_key() != &field.type_key {
            return Err(ConsistencyError::SnapshotDrift {
                key: self.snap.key.clone(),
                detail: format!(
                    "field {} declares {} in snapshot but {} in live graph",
                    field.name,
                    field.type_key,
                    live_field.type_key()
                ),
                at: self.stack.render(),
            });
        }
        self.rebind(&field.type_key, self.stack.for_field(&field.name))
    }

    /// Descend into an array element.
    pub fn for_array_index(&self, index: usize) -> Result<Self, ConsistencyError> {
        self.require_kind("array", &[SnapKind::Array])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.for_array_index(index))
    }

    /// Descend through a nullable wrapper. Transparent to path reporting.
    pub fn for_nullable_inner(&self) -> Result<Self, ConsistencyError> {
        self.require_kind("nullable", &[SnapKind::Nullable])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.clone())
    }

    /// Rebind to an arbitrary key within the same snapshot, stack unchanged.
    pub fn for_new_type(&self, key: &TypeKey) -> Result<Self, ConsistencyError> {
        self.rebind(key, self.stack.clone())
    }

    /// Descend into a map value with a synthetic field entry for the key.
    pub fn for_map_value(&self, key_text: &str) -> Result<Self, ConsistencyError> {
        self.require_kind("map", &[SnapKind::Map])?;
        let inner = self.inner_type_key()?;
        self.rebind(inner, self.stack.for_field(key_text))
    }
}
