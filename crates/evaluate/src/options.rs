//! Evaluation policy knobs.

use serde::{Deserialize, Serialize};

/// How undeclared shape keys are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnknownFieldPolicy {
    /// Report one `UnknownField` finding per undeclared key.
    #[default]
    Deny,
    /// Skip undeclared keys silently (permissive configurations).
    Allow,
}

/// Options shared by every traversal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOptions {
    /// Policy for undeclared shape keys.
    pub unknown_fields: UnknownFieldPolicy,
}

impl EvaluationOptions {
    /// Options with the permissive unknown-field policy.
    #[must_use]
    pub const fn permissive() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::Allow,
        }
    }
}
