//! Generic resource operations.
//!
//! [`create_operations`] turns a [`ResourceDescriptor`] into the full
//! operation set for that family. Every call routes through the shared
//! [`RequestClient`] with fixed path conventions:
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | `get_all` / `create` | GET / POST | `{endpoint}` |
//! | `get_by_id` / `update` / `remove` | GET / PUT / DELETE | `{endpoint}/{id}` |
//! | `search` | GET | `{endpoint}/search` |
//! | `bulk_create` | POST | `{endpoint}/bulk` |
//! | `mark_sold` | POST | `{endpoint}/{id}/mark-sold` |
//! | `export` | POST | `{endpoint}/export` |
//! | `batch` | POST | `{endpoint}/batch/{operation}` |
//!
//! Optional operations are only reachable through their handle accessors,
//! which return `None` when the feature is disabled.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use pokevault_core::RawId;
use pokevault_fetch::{RequestClient, RequestError, RequestOptions};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::descriptor::{Capability, ResourceDescriptor, ResourceFeatures};
use crate::mapping::{Identity, OutputMapping};

// ============================================================================
// Request Payloads
// ============================================================================

/// Body of a mark-sold call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    /// Final sale price.
    pub price: f64,
    /// Day the sale closed.
    pub sold_on: NaiveDate,
    /// Where it sold (eBay, local shop, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Buyer reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<String>,
}

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values.
    #[default]
    Csv,
    /// JSON document.
    Json,
    /// Zip archive with images.
    Zip,
}

/// Body of an export call. Empty `ids` exports the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Items to export.
    #[serde(default)]
    pub ids: Vec<String>,
    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,
}

// ============================================================================
// Shared State
// ============================================================================

struct OperationCore {
    client: RequestClient,
    descriptor: ResourceDescriptor,
    mapping: Arc<dyn OutputMapping>,
}

impl OperationCore {
    /// Fills in the operation label unless the caller set one.
    fn labelled(options: RequestOptions, label: String) -> RequestOptions {
        if options.operation.is_some() {
            options
        } else {
            options.operation(label)
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: Value) -> Result<T, RequestError> {
        Ok(serde_json::from_value(self.mapping.map(data))?)
    }
}

// ============================================================================
// Resource Operations
// ============================================================================

/// Operation set for one resource family.
///
/// Two sets built from equal descriptors are interchangeable: path
/// composition depends only on the descriptor and the call's inputs.
pub struct ResourceOperations {
    core: Arc<OperationCore>,
    mark_sold: Option<MarkSold>,
    export: Option<Exporter>,
    batch: Option<BatchOperations>,
}

impl fmt::Debug for ResourceOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOperations")
            .field("descriptor", &self.core.descriptor)
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}

/// Builds the operation set for `descriptor` with no output mapping.
pub fn create_operations(
    client: &RequestClient,
    descriptor: ResourceDescriptor,
    features: ResourceFeatures,
) -> ResourceOperations {
    ResourceOperations::builder(client, descriptor)
        .features(features)
        .build()
}

impl ResourceOperations {
    /// Creates a builder.
    pub fn builder(client: &RequestClient, descriptor: ResourceDescriptor) -> OperationsBuilder {
        OperationsBuilder::new(client, descriptor)
    }

    /// Returns the descriptor.
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.core.descriptor
    }

    /// Returns the mark-sold handle, if enabled.
    pub fn mark_sold(&self) -> Option<&MarkSold> {
        self.mark_sold.as_ref()
    }

    /// Returns the export handle, if enabled.
    pub fn export(&self) -> Option<&Exporter> {
        self.export.as_ref()
    }

    /// Returns the named batch operation handle, if enabled.
    pub fn batch(&self) -> Option<&BatchOperations> {
        self.batch.as_ref()
    }

    /// Returns true if `capability` is present on this set.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::MarkSold => self.mark_sold.is_some(),
            Capability::Export => self.export.is_some(),
            Capability::BatchOperations => self.batch.is_some(),
        }
    }

    /// Returns the optional capabilities present on this set.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.has(*c))
            .collect()
    }

    /// `GET {endpoint}` with `params` as the query string.
    ///
    /// # Errors
    ///
    /// Propagates errors from the request client.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let mut options =
            OperationCore::labelled(options, core.descriptor.collection_operation("fetch"));
        for (key, value) in params {
            options = options.query(*key, *value);
        }
        let data: Value = core.client.fetch(core.descriptor.endpoint(), options).await?;
        core.decode(data)
    }

    /// `GET {endpoint}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed identifier, otherwise
    /// propagates errors from the request client.
    pub async fn get_by_id<T: DeserializeOwned, R: RawId + ?Sized>(
        &self,
        id: &R,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let path = core.descriptor.item_path(id, None)?;
        let options = OperationCore::labelled(options, core.descriptor.operation("fetch"));
        let data: Value = core.client.fetch(&path, options).await?;
        core.decode(data)
    }

    /// `POST {endpoint}`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the request client.
    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let options = OperationCore::labelled(options, core.descriptor.operation("create"));
        let data: Value = core
            .client
            .create(core.descriptor.endpoint(), body, options)
            .await?;
        core.decode(data)
    }

    /// `PUT {endpoint}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed identifier, otherwise
    /// propagates errors from the request client.
    pub async fn update<T, B, R>(
        &self,
        id: &R,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        R: RawId + ?Sized,
    {
        let core = &self.core;
        let path = core.descriptor.item_path(id, None)?;
        let options = OperationCore::labelled(options, core.descriptor.operation("update"));
        let data: Value = core.client.replace(&path, body, options).await?;
        core.decode(data)
    }

    /// `DELETE {endpoint}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed identifier, otherwise
    /// propagates errors from the request client.
    pub async fn remove<R: RawId + ?Sized>(
        &self,
        id: &R,
        options: RequestOptions,
    ) -> Result<Option<Value>, RequestError> {
        let core = &self.core;
        let path = core.descriptor.item_path(id, None)?;
        let options = OperationCore::labelled(options, core.descriptor.operation("delete"));
        let removed = core.client.remove(&path, options).await?;
        Ok(removed.map(|data| core.mapping.map(data)))
    }

    /// `GET {endpoint}/search?q={query}` plus extra filters.
    ///
    /// # Errors
    ///
    /// Propagates errors from the request client.
    pub async fn search<T: DeserializeOwned>(
        &self,
        query: &str,
        filters: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let mut options =
            OperationCore::labelled(options, core.descriptor.collection_operation("search"))
                .query("q", query);
        for (key, value) in filters {
            options = options.query(*key, *value);
        }
        let data: Value = core
            .client
            .fetch(&core.descriptor.path("search"), options)
            .await?;
        core.decode(data)
    }

    /// `POST {endpoint}/bulk` with `{"items": [...]}`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the request client.
    pub async fn bulk_create<T: DeserializeOwned, B: Serialize>(
        &self,
        items: &[B],
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let options =
            OperationCore::labelled(options, core.descriptor.collection_operation("bulk create"));
        let items = serde_json::to_value(items)?;
        let body = json!({ "items": items });
        let data: Value = core
            .client
            .create(&core.descriptor.path("bulk"), &body, options)
            .await?;
        core.decode(data)
    }
}

// ============================================================================
// Optional Operations
// ============================================================================

/// Handle for `POST {endpoint}/{id}/mark-sold`.
pub struct MarkSold {
    core: Arc<OperationCore>,
}

impl MarkSold {
    /// Records a sale for `id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed identifier, otherwise
    /// propagates errors from the request client.
    pub async fn run<T: DeserializeOwned, R: RawId + ?Sized>(
        &self,
        id: &R,
        sale: &SaleDetails,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let path = core.descriptor.item_path(id, Some("mark-sold"))?;
        let options = OperationCore::labelled(options, core.descriptor.operation("mark sold"));
        let data: Value = core.client.create(&path, sale, options).await?;
        core.decode(data)
    }
}

/// Handle for `POST {endpoint}/export`.
pub struct Exporter {
    core: Arc<OperationCore>,
}

impl Exporter {
    /// Requests an export.
    ///
    /// # Errors
    ///
    /// Propagates errors from the request client.
    pub async fn run<T: DeserializeOwned>(
        &self,
        request: &ExportRequest,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let options =
            OperationCore::labelled(options, core.descriptor.collection_operation("export"));
        let data: Value = core
            .client
            .create(&core.descriptor.path("export"), request, options)
            .await?;
        core.decode(data)
    }
}

/// Handle for `POST {endpoint}/batch/{operation}`.
pub struct BatchOperations {
    core: Arc<OperationCore>,
}

impl BatchOperations {
    /// Runs the named server-side batch operation.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `operation` is not a usable path
    /// segment, otherwise propagates errors from the request client.
    pub async fn run<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        operation: &str,
        payload: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let core = &self.core;
        let path = core.descriptor.batch_path(operation)?;
        let options = OperationCore::labelled(
            options,
            core.descriptor
                .collection_operation(&format!("batch {}", operation.trim())),
        );
        let data: Value = core.client.create(&path, payload, options).await?;
        core.decode(data)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ResourceOperations`].
pub struct OperationsBuilder {
    client: RequestClient,
    descriptor: ResourceDescriptor,
    features: ResourceFeatures,
    mapping: Option<Arc<dyn OutputMapping>>,
}

impl OperationsBuilder {
    /// Creates a new builder.
    pub fn new(client: &RequestClient, descriptor: ResourceDescriptor) -> Self {
        Self {
            client: client.clone(),
            descriptor,
            features: ResourceFeatures::default(),
            mapping: None,
        }
    }

    /// Sets the optional operations.
    pub fn features(mut self, features: ResourceFeatures) -> Self {
        self.features = features;
        self
    }

    /// Sets the output mapping (default: [`Identity`]).
    pub fn mapping(mut self, mapping: Arc<dyn OutputMapping>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Builds the operation set.
    pub fn build(self) -> ResourceOperations {
        let core = Arc::new(OperationCore {
            client: self.client,
            descriptor: self.descriptor,
            mapping: self.mapping.unwrap_or_else(|| Arc::new(Identity)),
        });
        let features = self.features;

        debug!(
            resource = %core.descriptor,
            capabilities = ?features.capabilities(),
            "Created resource operations"
        );

        ResourceOperations {
            mark_sold: features.mark_sold.then(|| MarkSold {
                core: Arc::clone(&core),
            }),
            export: features.export.then(|| Exporter {
                core: Arc::clone(&core),
            }),
            batch: features.batch_operations.then(|| BatchOperations {
                core: Arc::clone(&core),
            }),
            core,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
