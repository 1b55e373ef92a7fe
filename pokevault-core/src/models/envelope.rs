//! The response envelope every Pokevault API response arrives in.
//!
//! ```json
//! { "success": true, "status": 200, "data": { ... }, "meta": { ... } }
//! ```
//!
//! Only `data` is handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransformError;

/// Wire shape of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    /// Whether the server considers the call successful.
    pub success: bool,
    /// HTTP-like status echoed by the server.
    #[serde(default)]
    pub status: u16,
    /// The payload.
    pub data: T,
    /// Pagination and other auxiliary information.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl<T> ResponseEnvelope<T> {
    /// Wraps `data` in a successful envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            status: 200,
            data,
            meta: Map::new(),
        }
    }

    /// Consumes the envelope, returning the payload.
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Parses a raw response body and returns its `data` field.
///
/// # Errors
///
/// Returns [`TransformError`] if the body is not JSON, is not an object
/// carrying `success` and `data`, or reports `success: false`.
pub fn unwrap_envelope(body: &[u8]) -> Result<Value, TransformError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| TransformError::Malformed(e.to_string()))?;
    unwrap_value(value)
}

/// Same as [`unwrap_envelope`] for an already parsed body.
///
/// # Errors
///
/// See [`unwrap_envelope`].
pub fn unwrap_value(value: Value) -> Result<Value, TransformError> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(TransformError::NotAnEnvelope(format!(
                "expected an object, got {}",
                kind_of(&other)
            )));
        }
    };

    let success = match object.get("success") {
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(TransformError::NotAnEnvelope(format!(
                "`success` must be a boolean, got {}",
                kind_of(other)
            )));
        }
        None => return Err(TransformError::NotAnEnvelope("missing `success`".into())),
    };

    if !success {
        return Err(TransformError::Unsuccessful(failure_message(&object)));
    }

    object
        .remove("data")
        .ok_or_else(|| TransformError::NotAnEnvelope("missing `data`".into()))
}

/// Extracts a human-readable failure message from an error body, if any.
///
/// Looks at `message`, then `error` (string or `{message}`), the way the API
/// reports failures inside and outside the envelope.
pub fn error_message(body: &[u8]) -> Option<String> {
    let Value::Object(object) = serde_json::from_slice::<Value>(body).ok()? else {
        return None;
    };
    let message = failure_message(&object);
    (!message.is_empty()).then_some(message)
}

fn failure_message(object: &Map<String, Value>) -> String {
    if let Some(Value::String(m)) = object.get("message") {
        return m.clone();
    }
    match object.get("error") {
        Some(Value::String(m)) => m.clone(),
        Some(Value::Object(e)) => e
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_returns_data() {
        let body = br#"{"success":true,"status":200,"data":{"id":"c1"},"meta":{}}"#;
        assert_eq!(unwrap_envelope(body).unwrap(), json!({"id": "c1"}));
    }

    #[test]
    fn test_unwrap_tolerates_missing_meta_and_status() {
        let body = br#"{"success":true,"data":[1,2]}"#;
        assert_eq!(unwrap_envelope(body).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_unwrap_rejects_bare_payload() {
        let body = br#"{"id":"c1"}"#;
        assert!(matches!(
            unwrap_envelope(body),
            Err(TransformError::NotAnEnvelope(_))
        ));
        assert!(matches!(
            unwrap_envelope(b"[1,2,3]"),
            Err(TransformError::NotAnEnvelope(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_non_json() {
        assert!(matches!(
            unwrap_envelope(b"<html>"),
            Err(TransformError::Malformed(_))
        ));
        assert!(matches!(
            unwrap_envelope(b""),
            Err(TransformError::Malformed(_))
        ));
    }

    #[test]
    fn test_unwrap_unsuccessful() {
        let body = br#"{"success":false,"status":200,"data":null,"message":"card locked"}"#;
        assert_eq!(
            unwrap_envelope(body),
            Err(TransformError::Unsuccessful("card locked".into()))
        );
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(br#"{"success":false,"error":{"message":"not found"}}"#),
            Some("not found".to_string())
        );
        assert_eq!(error_message(br#"{"error":"boom"}"#), Some("boom".to_string()));
        assert_eq!(error_message(b"oops"), None);
    }

    #[test]
    fn test_typed_envelope() {
        let env: ResponseEnvelope<Vec<u32>> =
            serde_json::from_str(r#"{"success":true,"status":201,"data":[7],"meta":{"page":1}}"#)
                .unwrap();
        assert_eq!(env.status, 201);
        assert_eq!(env.meta.get("page"), Some(&json!(1)));
        assert_eq!(env.into_data(), vec![7]);
    }
}
