//! # conflux-evaluate
//!
//! Recursive validation and default resolution over conflux schemas.
//!
//! Two traversal front-ends share one dispatch shape:
//!
//! - [`validate_value`] walks a raw value against a [`SchemaSnapshot`]
//!   alone, accumulating findings. It needs no live graph, so it runs
//!   anywhere a snapshot can be shipped.
//! - [`resolve_defaults`] and [`resolve_and_postprocess`] walk the live
//!   [`TypeGraph`], producing a resolved output tree with declared defaults
//!   filled in (and, in the latter mode, post-processing hooks applied).
//!
//! Both accumulate findings instead of failing fast; only
//! internal-consistency failures abort a traversal, surfaced as invariant
//! [`ErrorEnvelope`]s.
//!
//! [`SchemaSnapshot`]: conflux_schema::SchemaSnapshot
//! [`TypeGraph`]: conflux_schema::TypeGraph
//! [`ErrorEnvelope`]: conflux_shared::ErrorEnvelope

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Traversal contexts and pure descend operations.
pub mod context;
/// Accumulated findings and fatal consistency failures.
pub mod errors;
/// Evaluation policy knobs.
pub mod options;
/// Mode-aware default resolution and post-processing.
pub mod resolve;
/// Evaluation stack and path rendering.
pub mod stack;
/// Snapshot-only validation.
pub mod validate;

pub use context::{SnapshotContext, TraversalContext, TraversalMode};
pub use errors::{ConsistencyError, EvaluationError, EvaluationErrorKind};
pub use options::{EvaluationOptions, UnknownFieldPolicy};
pub use resolve::{evaluate, resolve_and_postprocess, resolve_defaults, ResolveOutcome};
pub use stack::{EvaluationStack, PathEntry};
pub use validate::validate_value;

/// Returns the evaluate crate version.
#[must_use]
pub const fn evaluate_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_crate_compiles() {
        assert!(!evaluate_crate_version().is_empty());
    }
}
