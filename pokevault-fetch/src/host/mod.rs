//! Host transports for the request pipeline.
//!
//! - [`http`] - `reqwest`-backed HTTP transport with base URL and default headers

pub mod http;

pub use http::HttpTransport;
