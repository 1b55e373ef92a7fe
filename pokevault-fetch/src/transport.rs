//! The transport seam between the request client and the network.

use std::time::Duration;

use async_trait::async_trait;
use pokevault_core::ResponseEnvelope;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::RequestError;

// ============================================================================
// Request Body
// ============================================================================

/// An outgoing body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured payload, normalized before sending.
    Json(Value),
    /// Raw file or binary upload, sent as-is.
    Binary {
        /// The bytes.
        bytes: Vec<u8>,
        /// MIME type, e.g. `image/png` or `application/zip`.
        content_type: String,
    },
}

impl RequestBody {
    /// Returns the JSON payload, if this is a structured body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Binary { .. } => None,
        }
    }
}

// ============================================================================
// Transport Request / Response
// ============================================================================

/// A fully composed request ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the transport's base URL, starting with `/`.
    pub path: String,
    /// Query pairs.
    pub query: Vec<(String, String)>,
    /// Caller-supplied headers.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<RequestBody>,
    /// Per-call timeout.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// Creates a bodiless request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A raw response: status plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response carrying a successful envelope around `data`.
    pub fn envelope(status: u16, data: Value) -> Self {
        let envelope = ResponseEnvelope {
            status,
            ..ResponseEnvelope::ok(data)
        };
        Self::new(status, serde_json::to_vec(&envelope).unwrap_or_default())
    }

    /// Creates a bodiless response (e.g. `204 No Content`).
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the body is empty or only whitespace.
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Returns the canonical reason phrase for the status.
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown status")
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends composed requests to the remote service.
///
/// Implementations report network failures as errors and return every
/// response that arrived, whatever its status. Status interpretation
/// belongs to the request client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, RequestError>;
}

// ============================================================================
// Tests
// ============================================================================
