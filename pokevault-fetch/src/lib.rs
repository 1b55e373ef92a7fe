// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Pokevault Fetch
//!
//! The request pipeline every Pokevault feature talks to the backend through.
//!
//! ## Request Client
//!
//! [`client::RequestClient`] exposes four verbs (fetch, create, replace,
//! remove), identifier-aware variants of each, file uploads, and batched
//! fetch/create. Every call:
//!
//! - validates identifiers before anything else happens
//! - resolves a [`config::RequestConfig`] from library, verb, and call-site settings
//! - runs through an [`strategy::OptimizationStrategy`]
//! - unwraps the response envelope to its `data`
//! - logs start/success/failure and hands failures to an [`hooks::ErrorPresenter`]
//!
//! ## Transport
//!
//! - [`transport::Transport`] - The seam to the network
//! - [`host::http`] - `reqwest`-backed implementation
//! - [`settings::PipelineSettings`] - Base URL, headers, and defaults from disk
//!
//! ## Batching
//!
//! [`batch::BatchProcessor`] coalesces single items submitted close together
//! into one bulk call, keyed per resource by [`batch::BatchKey`].
//!
//! ## Example
//!
//! ```ignore
//! use pokevault_fetch::{PipelineSettings, RequestClient, RequestOptions};
//!
//! let client = RequestClient::from_settings(&PipelineSettings::load()?)?;
//!
//! let card: Card = client
//!     .fetch_by_id("/cards", "base1-4", RequestOptions::new().operation("load card"))
//!     .await?;
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod settings;
pub mod strategy;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export key types at crate root

// Errors
pub use error::{ErrorKind, RequestError, SettingsError};

// Client & configuration
pub use client::{RequestClient, RequestClientBuilder};
pub use config::{
    OptimizationConfig, OptimizationOverrides, RequestConfig, RequestDefaults, RequestOptions,
    TransportOptions, Verb,
};
pub use settings::PipelineSettings;

// Transport
pub use host::HttpTransport;
pub use transport::{RequestBody, Transport, TransportRequest, TransportResponse};

// Collaborators
pub use batch::{BatchKey, BatchProcessor, BatchRegistry, BatchTicket, FlushFn};
pub use hooks::{
    ErrorPresenter, LogPresenter, Passthrough, PayloadNormalizer, ReferenceFlattener,
    SilentPresenter,
};
pub use strategy::{
    DefaultStrategy, ExecuteFn, OptimizationStrategy, OptimizingExecutor, PassThrough,
    RequestHints,
};
