//! Output mappings applied to response data before decoding.
//!
//! A mapping walks only the shapes it names. Nested blocks that are not
//! listed (price history, grading summaries, ...) are left exactly as the
//! server sent them.

use serde_json::{Map, Value};

/// Transforms response data for one resource family.
pub trait OutputMapping: Send + Sync {
    /// Returns the mapped data.
    fn map(&self, data: Value) -> Value;
}

/// Leaves data untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl OutputMapping for Identity {
    fn map(&self, data: Value) -> Value {
        data
    }
}

/// Copies a secondary identifier field onto the canonical `id` field.
///
/// Applied to the top-level object, to each object of a top-level array, and
/// to objects (or arrays of objects) under the explicitly listed nested keys.
/// An existing `id` is never overwritten.
///
/// ```ignore
/// let mapping = CanonicalId::new("_id").nested(["card"]);
/// // {"_id": "s1", "card": {"_id": "c1"}, "history": [{"_id": "h1"}]}
/// // becomes
/// // {"_id": "s1", "id": "s1", "card": {"_id": "c1", "id": "c1"}, "history": [{"_id": "h1"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalId {
    source: String,
    nested: Vec<String>,
}

impl CanonicalId {
    /// Maps `source` onto `id`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nested: Vec::new(),
        }
    }

    /// Also maps objects found under these keys.
    pub fn nested<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Returns the source field name.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn map_object(&self, mut object: Map<String, Value>, descend: bool) -> Map<String, Value> {
        if !object.contains_key("id") {
            if let Some(id @ (Value::String(_) | Value::Number(_))) = object.get(&self.source) {
                let id = id.clone();
                object.insert("id".to_string(), id);
            }
        }

        if descend {
            for key in &self.nested {
                if let Some(child) = object.remove(key) {
                    object.insert(key.clone(), self.map_shallow(child));
                }
            }
        }
        object
    }

    /// Maps an object or array of objects without descending further.
    fn map_shallow(&self, value: Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(self.map_object(object, false)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(object) => Value::Object(self.map_object(object, false)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl OutputMapping for CanonicalId {
    fn map(&self, data: Value) -> Value {
        match data {
            Value::Object(object) => Value::Object(self.map_object(object, true)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(object) => Value::Object(self.map_object(object, true)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
