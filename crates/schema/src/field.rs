//! Field model, default-value capabilities, and post-processing hooks.

use crate::types::TypeKey;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Capability interface for late-bound default values.
///
/// Producers are invoked with no arguments during default resolution and are
/// pure by convention; the engine enforces no contract on them.
pub trait DefaultProducer: Send + Sync {
    /// Produce the default value for a field omitted from raw input.
    fn produce(&self) -> Value;
}

/// Capability interface for per-type post-processing transforms.
///
/// Hooks run after a type's resolution completes, receiving the resolved
/// value and the rendered path of the current traversal position. A failed
/// hook is reported at that path and does not abort sibling traversal.
pub trait PostProcessor: Send + Sync {
    /// Transform the resolved value, or fail with a message.
    fn post_process(&self, value: Value, path: &str) -> Result<Value, PostProcessError>;
}

/// Failure returned by a [`PostProcessor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessError {
    message: String,
}

impl PostProcessError {
    /// Create a post-processing failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Borrow the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PostProcessError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl std::error::Error for PostProcessError {}

/// Declared default for an optional field.
#[derive(Clone)]
pub enum DefaultValue {
    /// Fixed literal copied into the resolved tree.
    Literal(Value),
    /// Late-bound producer invoked at resolution time.
    Producer(Arc<dyn DefaultProducer>),
}

impl DefaultValue {
    /// Materialize the default value (copy the literal or invoke the
    /// producer).
    #[must_use]
    pub fn materialize(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(producer) => producer.produce(),
        }
    }

    /// Serialized literal, when one exists. Producers are not serializable
    /// and return `None`.
    #[must_use]
    pub const fn literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Producer(_) => None,
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => formatter.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => formatter.write_str("Producer(..)"),
        }
    }
}

/// A named field on a shape or selector.
///
/// Members are private so a field can only be built through the
/// constructors below, which keep required fields defaultless.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    type_key: TypeKey,
    required: bool,
    default: Option<DefaultValue>,
}

impl Field {
    /// Declare a required field.
    pub fn required(name: impl Into<String>, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            type_key,
            required: true,
            default: None,
        }
    }

    /// Declare an optional field with no default.
    pub fn optional(name: impl Into<String>, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            type_key,
            required: false,
            default: None,
        }
    }

    /// Declare an optional field with a literal default.
    pub fn with_default(name: impl Into<String>, type_key: TypeKey, default: Value) -> Self {
        Self {
            name: name.into(),
            type_key,
            required: false,
            default: Some(DefaultValue::Literal(default)),
        }
    }

    /// Declare an optional field with a producer default.
    pub fn with_producer(
        name: impl Into<String>,
        type_key: TypeKey,
        producer: Arc<dyn DefaultProducer>,
    ) -> Self {
        Self {
            name: name.into(),
            type_key,
            required: false,
            default: Some(DefaultValue::Producer(producer)),
        }
    }

    /// Field name as it appears in raw input.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural key of the declared field type.
    #[must_use]
    pub const fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    /// Whether the field must be present in raw input.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Declared default, if any.
    #[must_use]
    pub const fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Canonical descriptor of the default, used for structural hashing.
    #[must_use]
    pub fn default_descriptor(&self) -> String {
        match &self.default {
            None => "none".to_string(),
            Some(DefaultValue::Producer(_)) => "producer".to_string(),
            Some(DefaultValue::Literal(value)) => format!("literal:{value}"),
        }
    }
}
