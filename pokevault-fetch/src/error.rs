//! Request pipeline error types.

use std::sync::Arc;
use thiserror::Error;

use pokevault_core::{TransformError, ValidationError};

// ============================================================================
// Error Kind
// ============================================================================

/// Coarse classification of a [`RequestError`].
///
/// This is what callers branch on: the pipeline guarantees that an awaited
/// call settles with the correct kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed identifier, raised before any network activity.
    Validation,
    /// Non-2xx status or network failure.
    Transport,
    /// Response did not have the expected shape.
    Transform,
    /// A batch flush failed for every member of that flush.
    BatchExecution,
}

// ============================================================================
// Request Error
// ============================================================================

/// Error type for every call made through the request client.
#[derive(Debug, Error)]
pub enum RequestError {
    /// An identifier failed validation.
    #[error("Invalid identifier: {0}")]
    Validation(#[from] ValidationError),

    /// The server answered with a non-2xx status.
    #[error("Request failed with status {status}: {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or the status reason.
        message: String,
    },

    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport configuration is unusable.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The response envelope did not match the expected shape.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// JSON (de)serialization of a payload failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The batch this item was queued in failed.
    ///
    /// Every member of a failed flush receives a clone of the same `Arc`.
    #[error("Batch execution failed: {0}")]
    BatchExecution(Arc<RequestError>),

    /// The batch processor went away before delivering a result.
    #[error("Batch was dropped before it was flushed")]
    BatchAborted,
}

impl RequestError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport { .. } | Self::Http(_) | Self::Settings(_) => ErrorKind::Transport,
            Self::Transform(_) | Self::Json(_) => ErrorKind::Transform,
            Self::BatchExecution(_) | Self::BatchAborted => ErrorKind::BatchExecution,
        }
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::BatchExecution(inner) => inner.status(),
            _ => None,
        }
    }

    /// Returns the batch-level error shared by all members of a failed flush.
    pub fn batch_cause(&self) -> Option<&Arc<RequestError>> {
        match self {
            Self::BatchExecution(inner) => Some(inner),
            _ => None,
        }
    }
}

// ============================================================================
// Settings Error
// ============================================================================

/// Error type for loading and validating pipeline settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Base URL could not be parsed.
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A header name or value is not valid HTTP.
    #[error("Invalid header {0:?}")]
    InvalidHeader(String),

    /// A setting is out of range.
    #[error("Invalid setting: {0}")]
    Invalid(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Tests
// ============================================================================
