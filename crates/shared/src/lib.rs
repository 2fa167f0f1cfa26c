//! # conflux-shared
//!
//! Shared error handling and result types for the conflux workspace.
//!
//! This crate provides foundational types that are used across all other
//! crates:
//!
//! - Structured error envelope with stable codes and metadata
//! - Result alias defaulting to the envelope error type
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - All public types support serialization

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod result;

pub use errors::{ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata};
pub use result::Result;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
