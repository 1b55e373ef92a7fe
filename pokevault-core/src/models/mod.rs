//! Domain models shared by the request pipeline.
//!
//! - [`identifier`] - Identifier validation and path composition
//! - [`envelope`] - The `{success, status, data, meta}` response wrapper

pub mod envelope;
pub mod identifier;

pub use envelope::{ResponseEnvelope, error_message, unwrap_envelope, unwrap_value};
pub use identifier::{Identifier, MAX_IDENTIFIER_LEN, RawId, build_path, join_path};
