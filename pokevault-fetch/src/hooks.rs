//! Side collaborators of the request client: error presentation and
//! outgoing payload normalization.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RequestError;

// ============================================================================
// Error Presenter
// ============================================================================

/// Surfaces failed calls to the user (toasts, banners, ...).
///
/// Side-effecting only: the client re-raises the error afterwards, whatever
/// the presenter does.
pub trait ErrorPresenter: Send + Sync {
    /// Presents `error`, with the call site's `message` when one was given.
    fn present(&self, error: &RequestError, message: Option<&str>);
}

/// Presenter that writes failures to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl ErrorPresenter for LogPresenter {
    fn present(&self, error: &RequestError, message: Option<&str>) {
        warn!(
            kind = ?error.kind(),
            status = ?error.status(),
            "{}",
            message.map_or_else(|| error.to_string(), str::to_string)
        );
    }
}

/// Presenter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPresenter;

impl ErrorPresenter for SilentPresenter {
    fn present(&self, _error: &RequestError, _message: Option<&str>) {}
}

// ============================================================================
// Payload Normalizer
// ============================================================================

/// Pure transform applied to structured request bodies before sending.
///
/// Never applied to binary bodies.
pub trait PayloadNormalizer: Send + Sync {
    /// Returns the normalized payload.
    fn normalize(&self, payload: Value) -> Value;
}

/// Leaves payloads untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PayloadNormalizer for Passthrough {
    fn normalize(&self, payload: Value) -> Value {
        payload
    }
}

/// Replaces embedded resource objects with their identifiers.
///
/// For each top-level field of an object payload: an object carrying one of
/// the identifier keys becomes that identifier, and an array of such objects
/// becomes an array of identifiers. Only one level is inspected.
///
/// ```ignore
/// {"card": {"id": "base1-4", "name": "Charizard"}, "price": 420}
/// // becomes
/// {"card": "base1-4", "price": 420}
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceFlattener {
    id_keys: Vec<String>,
}

impl Default for ReferenceFlattener {
    fn default() -> Self {
        Self::new(["id", "_id"])
    }
}

impl ReferenceFlattener {
    /// Creates a flattener recognizing the given identifier keys, in priority order.
    pub fn new<I, S>(id_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_keys: id_keys.into_iter().map(Into::into).collect(),
        }
    }

    fn reference_id(&self, object: &Map<String, Value>) -> Option<Value> {
        self.id_keys.iter().find_map(|key| match object.get(key) {
            Some(id @ (Value::String(_) | Value::Number(_))) => Some(id.clone()),
            _ => None,
        })
    }

    fn flatten_field(&self, value: Value) -> Value {
        match value {
            Value::Object(object) => match self.reference_id(&object) {
                Some(id) => id,
                None => Value::Object(object),
            },
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(object) => self
                            .reference_id(&object)
                            .unwrap_or(Value::Object(object)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl PayloadNormalizer for ReferenceFlattener {
    fn normalize(&self, payload: Value) -> Value {
        match payload {
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, self.flatten_field(value)))
                    .collect(),
            ),
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
