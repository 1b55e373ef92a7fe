// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Pokevault` Core
//!
//! Leaf types for the `Pokevault` outbound request pipeline.
//!
//! Nothing in this crate performs I/O. It provides:
//!
//! - [`Identifier`] - A validated path segment, and [`build_path`] to compose
//!   `{base}/{id}/{sub}` paths from untrusted values
//! - [`ResponseEnvelope`] - The wire wrapper every response arrives in, and
//!   [`unwrap_envelope`] to extract its `data`
//! - [`CoreError`], [`ValidationError`], [`TransformError`]

pub mod error;
pub mod models;

// Re-export error types
pub use error::{CoreError, TransformError, ValidationError};

// Re-export model types
pub use models::{
    // Identifiers
    Identifier,
    MAX_IDENTIFIER_LEN,
    RawId,
    build_path,
    join_path,
    // Envelopes
    ResponseEnvelope,
    error_message,
    unwrap_envelope,
    unwrap_value,
};
