// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Pokevault Resources
//!
//! Declarative resource families and the operations derived from them.
//!
//! Each family is described by a [`ResourceDescriptor`] (endpoint + label)
//! and a [`ResourceFeatures`] set. [`create_operations`] derives the full
//! operation set from those:
//!
//! - **Core**: list, get, create, update, remove, search, bulk create
//! - **Optional**: mark-sold, export, named batch operations
//!
//! ## Resource Families
//!
//! | Family | Endpoint | Mark sold | Export | Batch |
//! |--------|----------|-----------|--------|-------|
//! | Raw cards | `/cards` | ✅ | ✅ | ✅ |
//! | Graded cards | `/graded-cards` | ✅ | ✅ | ❌ |
//! | Sealed products | `/sealed-products` | ✅ | ✅ | ❌ |
//! | Auctions | `/auctions` | ❌ | ❌ | ✅ |
//! | Sales | `/sales` | ❌ | ✅ | ❌ |
//!
//! ## Usage
//!
//! ```ignore
//! use pokevault_fetch::{PipelineSettings, RequestClient, RequestOptions};
//! use pokevault_resources::{ResourceCatalog, ResourceKind};
//!
//! let client = RequestClient::from_settings(&PipelineSettings::load()?)?;
//! let cards = ResourceCatalog::operations(&client, ResourceKind::RawCards).unwrap();
//!
//! let card: Card = cards.get_by_id("base1-4", RequestOptions::new()).await?;
//! if let Some(export) = cards.export() {
//!     export.run::<ExportJob>(&ExportRequest::default(), RequestOptions::new()).await?;
//! }
//! ```

pub mod catalog;
pub mod descriptor;
pub mod mapping;
pub mod operations;

pub use catalog::{CatalogEntry, ResourceCatalog, ResourceKind};
pub use descriptor::{Capability, ResourceDescriptor, ResourceFeatures};
pub use mapping::{CanonicalId, Identity, OutputMapping};
pub use operations::{
    BatchOperations, ExportFormat, ExportRequest, Exporter, MarkSold, OperationsBuilder,
    ResourceOperations, SaleDetails, create_operations,
};
