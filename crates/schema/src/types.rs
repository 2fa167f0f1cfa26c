//! Type-graph nodes, scalar kinds, and structural key derivation.

use crate::field::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Primitive kinds accepted at scalar leaves and map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    /// Boolean scalar.
    Bool,
    /// Signed integer scalar.
    Int,
    /// Floating-point scalar. Accepts integer input values.
    Float,
    /// UTF-8 string scalar.
    String,
}

impl ScalarKind {
    /// Canonical name used in structural keys and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
        }
    }

    /// Structural key for the scalar type itself.
    #[must_use]
    pub fn type_key(self) -> TypeKey {
        TypeKey::new(format!("Scalar.{}", self.as_str()))
    }

    /// Returns true when the raw value coerces to this kind.
    #[must_use]
    pub fn matches_value(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Int => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Float => value.is_number(),
            Self::String => value.is_string(),
        }
    }

    /// Returns true when a map key's text parses as this kind.
    ///
    /// Map keys arrive as strings regardless of their declared kind, so the
    /// check is textual: `"42"` satisfies `Int`, `"true"` satisfies `Bool`.
    /// Float keys must be finite: `"NaN"`, `"inf"`, and overflowing
    /// literals are rejected.
    #[must_use]
    pub fn matches_key_text(self, text: &str) -> bool {
        match self {
            Self::Bool => text == "true" || text == "false",
            Self::Int => text.parse::<i64>().is_ok() || text.parse::<u64>().is_ok(),
            Self::Float => text.parse::<f64>().is_ok_and(f64::is_finite),
            Self::String => true,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Globally unique structural key identifying a type-graph node.
///
/// Two definitions with identical structure derive the same key, so the
/// type map collapses them to a single node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(String);

impl TypeKey {
    /// Wrap a key string. Keys are normally derived structurally; this
    /// constructor exists for snapshot deserialization and tests.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// A live type-graph node.
///
/// Children are referenced by [`TypeKey`] rather than inline, so recursion
/// always goes through the type map and the reachable set stays finite.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Leaf scalar of a fixed primitive kind.
    Scalar(ScalarKind),
    /// Homogeneous sequence of an inner type.
    Array {
        /// Key of the element type.
        inner: TypeKey,
    },
    /// Wrapper accepting an explicit null in place of the inner type.
    Nullable {
        /// Key of the wrapped type.
        inner: TypeKey,
    },
    /// Homomorphic mapping with fixed-kind keys.
    Map {
        /// Primitive kind every key must parse as.
        key_kind: ScalarKind,
        /// Key of the value type.
        value: TypeKey,
    },
    /// Composite requiring exactly one of its named fields in input.
    Selector {
        /// Declared branches, in declaration order.
        fields: Vec<Field>,
    },
    /// Record with named, possibly-required, possibly-defaulted fields.
    Shape {
        /// Declared fields, in declaration order.
        fields: Vec<Field>,
    },
}

impl TypeKind {
    /// Lowercase kind name for messages and metadata.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Array { .. } => "array",
            Self::Nullable { .. } => "nullable",
            Self::Map { .. } => "map",
            Self::Selector { .. } => "selector",
            Self::Shape { .. } => "shape",
        }
    }

    /// Declared fields for composite kinds.
    #[must_use]
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Selector { fields } | Self::Shape { fields } => Some(fields),
            _ => None,
        }
    }

    /// Inner type key for single-child kinds (array element, nullable
    /// wrapped type, map value).
    #[must_use]
    pub const fn inner_key(&self) -> Option<&TypeKey> {
        match self {
            Self::Array { inner } | Self::Nullable { inner } => Some(inner),
            Self::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Look up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields()
            .and_then(|fields| fields.iter().find(|field| field.name() == name))
    }

    /// Derive the structural key for this node.
    ///
    /// Scalars and single-child wrappers compose their inner keys textually;
    /// composites hash their canonical field descriptors so that key length
    /// stays bounded regardless of field count.
    #[must_use]
    pub fn derive_key(&self) -> TypeKey {
        match self {
            Self::Scalar(kind) => kind.type_key(),
            Self::Array { inner } => TypeKey::new(format!("Array.{inner}")),
            Self::Nullable { inner } => TypeKey::new(format!("Nullable.{inner}")),
            Self::Map { key_kind, value } => {
                TypeKey::new(format!("Map.{}.{value}", key_kind.as_str()))
            },
            Self::Selector { fields } => {
                TypeKey::new(format!("Selector.{}", hash_fields(fields)))
            },
            Self::Shape { fields } => TypeKey::new(format!("Shape.{}", hash_fields(fields))),
        }
    }
}

/// Hash canonical field descriptors into a short hex digest.
fn hash_fields(fields: &[Field]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.name().as_bytes());
        hasher.update(b":");
        hasher.update(field.type_key().as_str().as_bytes());
        hasher.update(b":");
        hasher.update(if field.is_required() { b"required" } else { b"optional" });
        hasher.update(b":");
        hasher.update(field.default_descriptor().as_bytes());
        hasher.update(b";");
    }
    let hash = format!("{:x}", hasher.finalize());
    hash.chars().take(16).collect()
}
