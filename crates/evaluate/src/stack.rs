//! Evaluation stack: the path from the schema root to the current position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One segment of an evaluation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathEntry {
    /// Descent into a named field (or a synthetic map key).
    Field(String),
    /// Descent into an array element.
    Index(usize),
}

/// Ordered, append-only path of entries from the schema root.
///
/// Stacks are never mutated in place: every descend returns a new value, so
/// stacks captured in earlier error records stay valid as traversal
/// continues deeper. Two stacks are equal iff their entry sequences are.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationStack {
    entries: Vec<PathEntry>,
}

impl EvaluationStack {
    /// The empty stack at the schema root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// New stack with a field-name entry appended.
    #[must_use]
    pub fn for_field(&self, name: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.push(PathEntry::Field(name.to_string()));
        Self { entries }
    }

    /// New stack with an array-index entry appended.
    #[must_use]
    pub fn for_array_index(&self, index: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.push(PathEntry::Index(index));
        Self { entries }
    }

    /// Borrow the entry sequence, root-to-leaf order.
    #[must_use]
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Returns true for the root stack.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Human-readable path for error messages, e.g.
    /// `root.field_a[2].field_b`. Presentation only.
    #[must_use]
    pub fn render(&self) -> String {
        let mut rendered = String::from("root");
        for entry in &self.entries {
            match entry {
                PathEntry::Field(name) => {
                    rendered.push('.');
                    rendered.push_str(name);
                },
                PathEntry::Index(index) => {
                    rendered.push('[');
                    rendered.push_str(&index.to_string());
                    rendered.push(']');
                },
            }
        }
        rendered
    }
}

impl fmt::Display for EvaluationStack {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_alone() {
        assert_eq!(EvaluationStack::root().render(), "root");
        assert!(EvaluationStack::root().is_empty());
    }

    #[test]
    fn descends_render_in_order() {
        let stack = EvaluationStack::root()
            .for_field("field_a")
            .for_array_index(2)
            .for_field("field_b");

        assert_eq!(stack.render(), "root.field_a[2].field_b");
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn descends_do_not_mutate_the_parent() {
        let parent = EvaluationStack::root().for_field("a");
        let child = parent.for_array_index(0);

        assert_eq!(parent.render(), "root.a");
        assert_eq!(child.render(), "root.a[0]");
    }

    #[test]
    fn equality_is_element_wise() {
        let left = EvaluationStack::root().for_field("a").for_array_index(1);
        let right = EvaluationStack::root().for_field("a").for_array_index(1);
        let other = EvaluationStack::root().for_field("a").for_array_index(2);

        assert_eq!(left, right);
        assert_ne!(left, other);
    }
}
