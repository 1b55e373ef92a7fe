//! The request client every feature funnels through.
//!
//! A call moves through these steps:
//!
//! 1. Identifier-aware verbs validate the identifier and fail fast, before
//!    configuration, logging, or network activity.
//! 2. Call-site options are merged over verb and library defaults.
//! 3. Structured bodies go through the payload normalizer.
//! 4. The optimization strategy wraps the transport invocation.
//! 5. The response envelope is unwrapped to its `data` and decoded.
//! 6. Start/success/failure are logged; failures are handed to the error
//!    presenter (unless suppressed) and re-raised.

use std::fmt;
use std::future::Future;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Weak};
use std::time::Instant;

use futures::future::{BoxFuture, try_join_all};
use pokevault_core::{
    Identifier, RawId, TransformError, build_path, error_message, join_path, unwrap_envelope,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::batch::{BatchKey, BatchProcessor, BatchRegistry, FlushFn};
use crate::config::{OptimizationOverrides, RequestConfig, RequestDefaults, RequestOptions, Verb};
use crate::error::{ErrorKind, RequestError};
use crate::hooks::{ErrorPresenter, LogPresenter, Passthrough, PayloadNormalizer};
use crate::host::HttpTransport;
use crate::settings::PipelineSettings;
use crate::strategy::{DefaultStrategy, ExecuteFn, OptimizationStrategy, RequestHints};
use crate::transport::{RequestBody, Transport, TransportRequest, TransportResponse};

type BulkFuture = BoxFuture<'static, Result<Vec<Value>, RequestError>>;

// ============================================================================
// Request Client
// ============================================================================

/// Façade over transport, optimization, batching, and logging.
///
/// Cloning is cheap; clones share batch processors and collaborators.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    strategy: Arc<dyn OptimizationStrategy>,
    presenter: Arc<dyn ErrorPresenter>,
    normalizer: Arc<dyn PayloadNormalizer>,
    defaults: RequestDefaults,
    fetch_batches: BatchRegistry<Identifier, Value>,
    create_batches: BatchRegistry<Value, Value>,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("strategy", &self.inner.strategy.name())
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    /// Creates a client over `transport` with default collaborators.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    /// Creates a builder for customizing the client.
    pub fn builder(transport: Arc<dyn Transport>) -> RequestClientBuilder {
        RequestClientBuilder::new(transport)
    }

    /// Creates a client with an [`HttpTransport`] configured from `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the HTTP client
    /// cannot be built.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, RequestError> {
        let transport = HttpTransport::from_settings(settings)?;
        Ok(Self::builder(Arc::new(transport))
            .defaults(settings.request_defaults())
            .build())
    }

    /// Returns the library defaults this client was built with.
    pub fn defaults(&self) -> &RequestDefaults {
        &self.inner.defaults
    }

    /// Returns the name of the optimization strategy.
    pub fn strategy_name(&self) -> &str {
        self.inner.strategy.name()
    }

    /// Returns how many batch processors have been created.
    pub fn batch_processor_count(&self) -> usize {
        self.inner.fetch_batches.len() + self.inner.create_batches.len()
    }

    // ------------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------------

    /// `GET path`, returning the decoded envelope data.
    ///
    /// # Errors
    ///
    /// Returns a transport error for network failures and non-2xx statuses,
    /// or a transform error if the body is not an envelope or `data` does
    /// not decode into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let config = self.inner.resolve(Verb::Fetch, path, &[], options);
        self.inner.run(Verb::Fetch, path, None, &config).await
    }

    /// `GET {base}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] for a malformed identifier,
    /// otherwise as [`RequestClient::fetch`].
    pub async fn fetch_by_id<T: DeserializeOwned, R: RawId + ?Sized>(
        &self,
        base: &str,
        id: &R,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let path = build_path(base, id, None)?;
        self.fetch(&path, options).await
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// As [`RequestClient::fetch`], plus a JSON error if `body` cannot be serialized.
    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let body = self.inner.prepare(RequestBody::Json(serde_json::to_value(body)?));
        let config = self.inner.resolve(Verb::Create, path, &[], options);
        self.inner.run(Verb::Create, path, Some(body), &config).await
    }

    /// `POST {base}/{id}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] for a malformed identifier,
    /// otherwise as [`RequestClient::create`].
    pub async fn create_at_id<T, B, R>(
        &self,
        base: &str,
        id: &R,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        R: RawId + ?Sized,
    {
        let path = build_path(base, id, None)?;
        self.create(&path, body, options).await
    }

    /// `POST path` with a raw binary body (file uploads).
    ///
    /// Binary bodies bypass the payload normalizer.
    ///
    /// # Errors
    ///
    /// As [`RequestClient::fetch`].
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let body = self.inner.prepare(RequestBody::Binary {
            bytes,
            content_type: content_type.into(),
        });
        let config = self.inner.resolve(Verb::Create, path, &[], options);
        self.inner.run(Verb::Create, path, Some(body), &config).await
    }

    // ------------------------------------------------------------------------
    // Replace
    // ------------------------------------------------------------------------

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// As [`RequestClient::create`].
    pub async fn replace<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let body = self.inner.prepare(RequestBody::Json(serde_json::to_value(body)?));
        let config = self.inner.resolve(Verb::Replace, path, &[], options);
        self.inner.run(Verb::Replace, path, Some(body), &config).await
    }

    /// `PUT {base}/{id}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] for a malformed identifier,
    /// otherwise as [`RequestClient::replace`].
    pub async fn replace_by_id<T, B, R>(
        &self,
        base: &str,
        id: &R,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        R: RawId + ?Sized,
    {
        let path = build_path(base, id, None)?;
        self.replace(&path, body, options).await
    }

    // ------------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------------

    /// `DELETE path`.
    ///
    /// Resolves to `None` for an empty 2xx body or null `data`. A 2xx body
    /// that is not an envelope is returned raw instead of failing.
    ///
    /// # Errors
    ///
    /// Returns a transport error for network failures and non-2xx statuses.
    pub async fn remove(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, RequestError> {
        let config = self.inner.resolve(Verb::Remove, path, &[], options);
        self.inner
            .instrumented(Verb::Remove, path, &config, async {
                let response = self.inner.perform(Verb::Remove, path, None, &config).await?;
                Ok(removal_result(&response))
            })
            .await
    }

    /// `DELETE {base}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] for a malformed identifier,
    /// otherwise as [`RequestClient::remove`].
    pub async fn remove_by_id<R: RawId + ?Sized>(
        &self,
        base: &str,
        id: &R,
        options: RequestOptions,
    ) -> Result<Option<Value>, RequestError> {
        let path = build_path(base, id, None)?;
        self.remove(&path, options).await
    }

    // ------------------------------------------------------------------------
    // Batched
    // ------------------------------------------------------------------------

    /// Fetches one item through the batch processor for `base`.
    ///
    /// Items submitted by independent callers within one batch window are
    /// flushed together as `POST {base}/batch/fetch` with `{"ids": [...]}`.
    /// With batching disabled this is [`RequestClient::fetch_by_id`].
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] for a malformed identifier,
    /// [`RequestError::BatchExecution`] if the flush failed, or a JSON error
    /// if this item's data does not decode into `T`.
    pub async fn fetch_batched<T: DeserializeOwned, R: RawId + ?Sized>(
        &self,
        base: &str,
        id: &R,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let id = Identifier::parse(id)?;
        self.fetch_batched_id(base, id, options).await
    }

    /// Fetches many items through the batch processor for `base`.
    ///
    /// Every identifier is validated before anything is queued.
    ///
    /// # Errors
    ///
    /// As [`RequestClient::fetch_batched`]; the first failure wins.
    pub async fn batch_fetch<T: DeserializeOwned, R: RawId>(
        &self,
        base: &str,
        ids: &[R],
        options: RequestOptions,
    ) -> Result<Vec<T>, RequestError> {
        let ids = ids
            .iter()
            .map(|id| Identifier::parse(id))
            .collect::<Result<Vec<_>, _>>()?;

        try_join_all(
            ids.into_iter()
                .map(|id| self.fetch_batched_id(base, id, options.clone())),
        )
        .await
    }

    /// Creates one item through the batch processor for `base`.
    ///
    /// Items submitted within one batch window are flushed together as
    /// `POST {base}/bulk` with `{"items": [...]}`. With batching disabled
    /// this is [`RequestClient::create`] on `base`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::BatchExecution`] if the flush failed, or a
    /// JSON error if the item cannot be serialized or its result decoded.
    pub async fn create_batched<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        base: &str,
        item: &B,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let item = serde_json::to_value(item)?;
        self.create_batched_value(base, item, options).await
    }

    /// Creates many items through the batch processor for `base`.
    ///
    /// # Errors
    ///
    /// As [`RequestClient::create_batched`]; the first failure wins.
    pub async fn batch_create<T: DeserializeOwned, B: Serialize>(
        &self,
        base: &str,
        items: &[B],
        options: RequestOptions,
    ) -> Result<Vec<T>, RequestError> {
        let items = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        try_join_all(
            items
                .into_iter()
                .map(|item| self.create_batched_value(base, item, options.clone())),
        )
        .await
    }

    async fn fetch_batched_id<T: DeserializeOwned>(
        &self,
        base: &str,
        id: Identifier,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let path = join_path(base, &id, None);
        let config = self.inner.resolve(
            Verb::Fetch,
            &path,
            &[OptimizationOverrides::batching()],
            options,
        );

        if !config.optimization.enable_batching {
            return self.inner.run(Verb::Fetch, &path, None, &config).await;
        }

        let ticket = self.inner.fetch_processor(base, &config).add(id);
        self.inner
            .instrumented(Verb::Fetch, &path, &config, async {
                Ok(serde_json::from_value(ticket.await?)?)
            })
            .await
    }

    async fn create_batched_value<T: DeserializeOwned>(
        &self,
        base: &str,
        item: Value,
        options: RequestOptions,
    ) -> Result<T, RequestError> {
        let config = self.inner.resolve(
            Verb::Create,
            base,
            &[OptimizationOverrides::batching()],
            options,
        );
        let item = self.inner.normalizer.normalize(item);

        if !config.optimization.enable_batching {
            let body = RequestBody::Json(item);
            return self.inner.run(Verb::Create, base, Some(body), &config).await;
        }

        let ticket = self.inner.create_processor(base, &config).add(item);
        self.inner
            .instrumented(Verb::Create, base, &config, async {
                Ok(serde_json::from_value(ticket.await?)?)
            })
            .await
    }
}

// ============================================================================
// Pipeline Internals
// ============================================================================

impl ClientInner {
    fn resolve(
        &self,
        verb: Verb,
        path: &str,
        layers: &[OptimizationOverrides],
        options: RequestOptions,
    ) -> RequestConfig {
        RequestConfig::resolve(&self.defaults, verb, path, layers, options)
    }

    /// Normalizes structured bodies; binary bodies pass untouched.
    fn prepare(&self, body: RequestBody) -> RequestBody {
        match body {
            RequestBody::Json(value) => RequestBody::Json(self.normalizer.normalize(value)),
            binary @ RequestBody::Binary { .. } => binary,
        }
    }

    /// Performs, unwraps, and decodes one call under logging.
    async fn run<T: DeserializeOwned>(
        &self,
        verb: Verb,
        path: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<T, RequestError> {
        self.instrumented(verb, path, config, async {
            let response = self.perform(verb, path, body, config).await?;
            let data = unwrap_envelope(&response.body)?;
            Ok(serde_json::from_value(data)?)
        })
        .await
    }

    /// Sends one request through the optimization strategy.
    ///
    /// Resolves only to 2xx responses.
    async fn perform(
        &self,
        verb: Verb,
        path: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<TransportResponse, RequestError> {
        let request = TransportRequest {
            method: verb.method(),
            path: path.to_string(),
            query: config.transport.query.clone(),
            headers: config.transport.headers.clone(),
            body,
            timeout: config.transport.timeout,
        };
        let hints = RequestHints::from(&request);

        let transport = Arc::clone(&self.transport);
        let execute: ExecuteFn = Box::new(
            move || -> BoxFuture<'static, Result<TransportResponse, RequestError>> {
                Box::pin(async move { ensure_success(transport.send(request).await?) })
            },
        );

        self.strategy
            .optimize(execute, &hints, &config.optimization)
            .await
    }

    /// Wraps `call` with start/success/failure logging and error presentation.
    async fn instrumented<T, F>(
        &self,
        verb: Verb,
        path: &str,
        config: &RequestConfig,
        call: F,
    ) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, RequestError>>,
    {
        let span = info_span!(
            "request",
            operation = %config.operation,
            method = %verb.method(),
            path = %path
        );

        async {
            let started = Instant::now();
            if config.log_request {
                debug!("Request started");
            }

            match call.await {
                Ok(value) => {
                    if config.log_response {
                        info!(
                            duration = ?started.elapsed(),
                            detail = config.success_message.as_deref().unwrap_or("completed"),
                            "Request succeeded"
                        );
                    }
                    Ok(value)
                }
                Err(error) => {
                    warn!(
                        duration = ?started.elapsed(),
                        kind = ?error.kind(),
                        error = %error,
                        user_message = ?config.error_message,
                        "Request failed"
                    );
                    self.present(&error, config);
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn present(&self, error: &RequestError, config: &RequestConfig) {
        if config.suppress_error_toast || error.kind() == ErrorKind::Validation {
            return;
        }
        self.presenter
            .present(error, config.error_message.as_deref());
    }

    /// Sends one bulk request and checks that `data` has `expected` entries.
    ///
    /// Failures are presented by each waiting caller, not here.
    async fn flush_bulk(
        &self,
        label: &str,
        path: String,
        body: Value,
        expected: usize,
        options: RequestOptions,
    ) -> Result<Vec<Value>, RequestError> {
        let config = self.resolve(Verb::Create, &path, &[], options.operation(label));

        self.instrumented(Verb::Create, &path, &config, async {
            let response = self
                .perform(Verb::Create, &path, Some(RequestBody::Json(body)), &config)
                .await?;
            match unwrap_envelope(&response.body)? {
                Value::Array(items) if items.len() == expected => Ok(items),
                Value::Array(items) => Err(TransformError::UnexpectedShape(format!(
                    "expected {expected} results, got {}",
                    items.len()
                ))
                .into()),
                _ => Err(TransformError::UnexpectedShape(
                    "bulk response data is not an array".into(),
                )
                .into()),
            }
        })
        .await
    }

    fn fetch_processor(
        self: &Arc<Self>,
        base: &str,
        config: &RequestConfig,
    ) -> BatchProcessor<Identifier, Value> {
        let key = batch_key("fetch", base, config);
        let base = key.base.clone();
        let options = flush_options(config);
        let client = Arc::downgrade(self);

        self.fetch_batches.get_or_create(key, move || -> FlushFn<Identifier, Value> {
            Arc::new(
                move |ids: Vec<Identifier>| -> BulkFuture {
                    let client: Weak<ClientInner> = client.clone();
                    let base = base.clone();
                    let options = options.clone();
                    Box::pin(async move {
                        let inner = client.upgrade().ok_or(RequestError::BatchAborted)?;
                        let expected = ids.len();
                        inner
                            .flush_bulk(
                                &format!("batch fetch {base}"),
                                format!("{base}/batch/fetch"),
                                json!({ "ids": ids }),
                                expected,
                                options,
                            )
                            .await
                    })
                },
            )
        })
    }

    fn create_processor(
        self: &Arc<Self>,
        base: &str,
        config: &RequestConfig,
    ) -> BatchProcessor<Value, Value> {
        let key = batch_key("create", base, config);
        let base = key.base.clone();
        let options = flush_options(config);
        let client = Arc::downgrade(self);

        self.create_batches.get_or_create(key, move || -> FlushFn<Value, Value> {
            Arc::new(
                move |items: Vec<Value>| -> BulkFuture {
                    let client: Weak<ClientInner> = client.clone();
                    let base = base.clone();
                    let options = options.clone();
                    Box::pin(async move {
                        let inner = client.upgrade().ok_or(RequestError::BatchAborted)?;
                        let expected = items.len();
                        inner
                            .flush_bulk(
                                &format!("batch create {base}"),
                                format!("{base}/bulk"),
                                json!({ "items": items }),
                                expected,
                                options,
                            )
                            .await
                    })
                },
            )
        })
    }
}

/// Callers only share a processor when their bulk requests would be identical.
fn batch_key(operation: &str, base: &str, config: &RequestConfig) -> BatchKey {
    let mut hasher = DefaultHasher::new();
    config.transport.fingerprint().hash(&mut hasher);
    (config.log_request, config.log_response).hash(&mut hasher);

    BatchKey {
        operation: operation.to_string(),
        base: base.trim_end_matches('/').to_string(),
        batch_size: config.optimization.batch_size.max(1),
        batch_delay_ms: config.optimization.batch_delay_ms,
        scope: hasher.finish(),
    }
}

/// Options the bulk request inherits from the callers of one processor.
fn flush_options(config: &RequestConfig) -> RequestOptions {
    RequestOptions {
        log_request: Some(config.log_request),
        log_response: Some(config.log_response),
        suppress_error_toast: Some(true),
        transport: config.transport.clone(),
        ..RequestOptions::new()
    }
    .cache(false)
}

/// Turns non-2xx responses into transport errors.
fn ensure_success(response: TransportResponse) -> Result<TransportResponse, RequestError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = error_message(&response.body).unwrap_or_else(|| response.reason().to_string());
    Err(RequestError::Transport {
        status: response.status,
        message,
    })
}

/// Interprets a 2xx removal response.
fn removal_result(response: &TransportResponse) -> Option<Value> {
    if response.is_empty() {
        return None;
    }

    match unwrap_envelope(&response.body) {
        Ok(Value::Null) => None,
        Ok(data) => Some(data),
        Err(error) => {
            debug!(
                status = response.status,
                error = %error,
                "Removal response is not an envelope, returning raw body"
            );
            Some(serde_json::from_slice(&response.body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&response.body).into_owned())
            }))
        }
    }
}

// ============================================================================
// Request Client Builder
// ============================================================================

/// Builder for constructing a [`RequestClient`].
///
/// Collaborators are fixed at build time; there is no way to swap them on a
/// live client.
pub struct RequestClientBuilder {
    transport: Arc<dyn Transport>,
    strategy: Option<Arc<dyn OptimizationStrategy>>,
    presenter: Option<Arc<dyn ErrorPresenter>>,
    normalizer: Option<Arc<dyn PayloadNormalizer>>,
    defaults: RequestDefaults,
}

impl RequestClientBuilder {
    /// Creates a new builder.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            strategy: None,
            presenter: None,
            normalizer: None,
            defaults: RequestDefaults::default(),
        }
    }

    /// Sets the optimization strategy (default: [`DefaultStrategy`] without executor).
    pub fn strategy(mut self, strategy: Arc<dyn OptimizationStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Sets the error presenter (default: [`LogPresenter`]).
    pub fn presenter(mut self, presenter: Arc<dyn ErrorPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Sets the payload normalizer (default: [`Passthrough`]).
    pub fn normalizer(mut self, normalizer: Arc<dyn PayloadNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Sets the library defaults.
    pub fn defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builds the client.
    pub fn build(self) -> RequestClient {
        RequestClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                strategy: self
                    .strategy
                    .unwrap_or_else(|| Arc::new(DefaultStrategy::new())),
                presenter: self.presenter.unwrap_or_else(|| Arc::new(LogPresenter)),
                normalizer: self.normalizer.unwrap_or_else(|| Arc::new(Passthrough)),
                defaults: self.defaults,
                fetch_batches: BatchRegistry::new(),
                create_batches: BatchRegistry::new(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
