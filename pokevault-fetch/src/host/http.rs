//! HTTP transport backed by `reqwest`.
//!
//! This module provides the production [`Transport`] that adds:
//! - Base URL joining
//! - Default headers from [`PipelineSettings`], overridable per call
//! - Request/response tracing

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{RequestError, SettingsError};
use crate::settings::PipelineSettings;
use crate::transport::{RequestBody, Transport, TransportRequest, TransportResponse};

// ============================================================================
// HTTP Transport
// ============================================================================

/// `reqwest`-backed transport rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
    base_url: Url,
    default_headers: HeaderMap,
}

impl HttpTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::from_settings`].
    pub fn new() -> Result<Self, RequestError> {
        Self::from_settings(&PipelineSettings::default())
    }

    /// Creates a transport from pipeline settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, a default header is not
    /// valid HTTP, or the TLS backend cannot be initialized.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, RequestError> {
        settings.validate()?;
        let base_url = settings.parsed_base_url()?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &settings.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SettingsError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| SettingsError::InvalidHeader(name.to_string()))?;
            default_headers.insert(name, value);
        }

        let inner = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            inner,
            base_url,
            default_headers,
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a request path and query against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] if the composed URL cannot be parsed.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, RequestError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}")).map_err(|e| SettingsError::InvalidUrl {
            url: format!("{base}/{path}"),
            reason: e.to_string(),
        })?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, RequestError> {
        let url = self.url_for(&request.path, &request.query)?;
        debug!(url = %url, "Sending request");

        let mut headers = self.default_headers.clone();
        headers.extend(request.headers);

        let mut builder = self.inner.request(request.method, url).headers(headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Binary {
                bytes,
                content_type,
            }) => builder.header(CONTENT_TYPE, content_type).body(bytes),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Response received");
        Ok(TransportResponse { status, body })
    }
}

// ============================================================================
// Tests
// ============================================================================
