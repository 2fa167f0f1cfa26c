//! # conflux-schema
//!
//! Live configuration type graph and serializable schema snapshot.
//! This crate depends on `shared` only.
//!
//! The live graph ([`TypeGraph`]) holds behavior: default-value producers
//! and post-processing hooks attached at declaration time. The snapshot
//! ([`SchemaSnapshot`]) is the data-only flattening that crosses process
//! boundaries.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Field model, default-value capabilities, and post-processing hooks.
pub mod field;
/// Immutable type graph and its builder.
pub mod graph;
/// Serializable schema snapshot and conversion from the live graph.
pub mod snapshot;
/// Type-graph nodes, scalar kinds, and structural keys.
pub mod types;

pub use field::{DefaultProducer, DefaultValue, Field, PostProcessError, PostProcessor};
pub use graph::{GraphBuilder, SchemaError, TypeGraph};
pub use snapshot::{FieldSnap, SchemaSnapshot, SnapKind, TypeSnap};
pub use types::{ScalarKind, TypeKey, TypeKind};

/// Returns the schema crate version.
#[must_use]
pub const fn schema_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
