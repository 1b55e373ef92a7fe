//! Core error types for `Pokevault`.

use thiserror::Error;

/// Core error type for `Pokevault` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An identifier failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A response body did not have the expected envelope shape.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

// ============================================================================
// Validation Error
// ============================================================================

/// Raised when a value cannot be used as a path segment.
///
/// This is a caller-programming-error signal: it is raised before any
/// network activity and is never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No identifier was supplied at all.
    #[error("Identifier is missing")]
    Missing,

    /// Identifier is empty after trimming.
    #[error("Identifier is empty")]
    Empty,

    /// Identifier is a stringified placeholder such as `"null"`.
    #[error("Identifier is a placeholder value: {0:?}")]
    Sentinel(String),

    /// Identifier looks like a stringified object (`"[object Object]"`).
    #[error("Identifier looks like a serialized object: {0:?}")]
    ObjectLike(String),

    /// Identifier exceeds the maximum length.
    #[error("Identifier is {len} characters long (max {max})")]
    TooLong {
        /// Length of the rejected identifier.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },
}

// ============================================================================
// Transform Error
// ============================================================================

/// Raised when a response body does not match the `{success, status, data, meta}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The body was not valid JSON.
    #[error("Response body is not valid JSON: {0}")]
    Malformed(String),

    /// The body was JSON but not an envelope.
    #[error("Response is not an envelope: {0}")]
    NotAnEnvelope(String),

    /// The envelope reported `success: false`.
    #[error("Response reported failure: {0}")]
    Unsuccessful(String),

    /// The envelope's `data` did not have the shape the caller asked for.
    #[error("Unexpected data shape: {0}")]
    UnexpectedShape(String),
}
