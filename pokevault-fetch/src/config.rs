//! Per-call request configuration.
//!
//! A [`RequestConfig`] is resolved for every call by layering, in increasing
//! priority: library defaults ([`RequestDefaults`]), per-verb defaults
//! ([`Verb::defaults`]), and call-site overrides ([`RequestOptions`]). It is
//! discarded once the call settles.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

// ============================================================================
// Verb
// ============================================================================

/// The four request verbs the client exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read (`GET`).
    Fetch,
    /// Create (`POST`).
    Create,
    /// Full replace (`PUT`).
    Replace,
    /// Delete (`DELETE`).
    Remove,
}

impl Verb {
    /// Returns the HTTP method for this verb.
    pub fn method(self) -> Method {
        match self {
            Self::Fetch => Method::GET,
            Self::Create => Method::POST,
            Self::Replace => Method::PUT,
            Self::Remove => Method::DELETE,
        }
    }

    /// Optimization defaults for this verb.
    ///
    /// Reads are cached and deduplicated; writes are deduplicated but never
    /// cached; removals are neither.
    pub fn defaults(self) -> OptimizationOverrides {
        match self {
            Self::Fetch => OptimizationOverrides {
                enable_cache: Some(true),
                enable_deduplication: Some(true),
                ..Default::default()
            },
            Self::Create | Self::Replace => OptimizationOverrides {
                enable_cache: Some(false),
                enable_deduplication: Some(true),
                ..Default::default()
            },
            Self::Remove => OptimizationOverrides {
                enable_cache: Some(false),
                enable_deduplication: Some(false),
                ..Default::default()
            },
        }
    }
}

// ============================================================================
// Optimization Config
// ============================================================================

/// Caching, deduplication, and batching hints for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Whether the optimizing executor may serve this call from cache.
    pub enable_cache: bool,
    /// Cache time-to-live, in seconds.
    pub cache_ttl_secs: u64,
    /// Whether identical in-flight calls may be collapsed.
    pub enable_deduplication: bool,
    /// Whether batch verbs coalesce items into bulk calls.
    pub enable_batching: bool,
    /// Queue length that triggers an immediate flush.
    pub batch_size: usize,
    /// How long a batch window stays open, in milliseconds.
    pub batch_delay_ms: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache_ttl_secs: 300,
            enable_deduplication: false,
            enable_batching: false,
            batch_size: 10,
            batch_delay_ms: 50,
        }
    }
}

impl OptimizationConfig {
    /// Returns the cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Returns the batch window length.
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Returns true if the call should go through the optimizing executor.
    pub fn wants_executor(&self) -> bool {
        self.enable_cache || self.enable_deduplication
    }
}

/// Partial [`OptimizationConfig`]; `None` keeps the lower layer's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationOverrides {
    /// See [`OptimizationConfig::enable_cache`].
    pub enable_cache: Option<bool>,
    /// See [`OptimizationConfig::cache_ttl_secs`].
    pub cache_ttl_secs: Option<u64>,
    /// See [`OptimizationConfig::enable_deduplication`].
    pub enable_deduplication: Option<bool>,
    /// See [`OptimizationConfig::enable_batching`].
    pub enable_batching: Option<bool>,
    /// See [`OptimizationConfig::batch_size`].
    pub batch_size: Option<usize>,
    /// See [`OptimizationConfig::batch_delay_ms`].
    pub batch_delay_ms: Option<u64>,
}

impl OptimizationOverrides {
    /// Layer that turns batching on; applied by the batch verbs.
    pub fn batching() -> Self {
        Self {
            enable_batching: Some(true),
            ..Default::default()
        }
    }

    /// Writes every set field onto `config`.
    pub fn apply_to(&self, config: &mut OptimizationConfig) {
        if let Some(v) = self.enable_cache {
            config.enable_cache = v;
        }
        if let Some(v) = self.cache_ttl_secs {
            config.cache_ttl_secs = v;
        }
        if let Some(v) = self.enable_deduplication {
            config.enable_deduplication = v;
        }
        if let Some(v) = self.enable_batching {
            config.enable_batching = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v.max(1);
        }
        if let Some(v) = self.batch_delay_ms {
            config.batch_delay_ms = v;
        }
    }
}

// ============================================================================
// Transport Options
// ============================================================================

/// Options handed through to the transport untouched.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Extra headers (auth and friends are the caller's business).
    pub headers: HeaderMap,
    /// Per-call timeout, overriding the transport default.
    pub timeout: Option<Duration>,
    /// Query string pairs, in order.
    pub query: Vec<(String, String)>,
}

impl TransportOptions {
    /// Hash of every option, independent of header insertion order.
    pub fn fingerprint(&self) -> u64 {
        let mut headers: Vec<(&str, &[u8])> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_bytes()))
            .collect();
        headers.sort_unstable();

        let mut hasher = DefaultHasher::new();
        headers.hash(&mut hasher);
        self.timeout.hash(&mut hasher);
        self.query.hash(&mut hasher);
        hasher.finish()
    }
}

// ============================================================================
// Request Defaults
// ============================================================================

/// Library-wide defaults, fixed when the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Log call start.
    pub log_request: bool,
    /// Log call success.
    pub log_response: bool,
    /// Skip the error presenter on failure.
    pub suppress_error_toast: bool,
    /// Baseline optimization settings.
    pub optimization: OptimizationConfig,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            log_request: true,
            log_response: true,
            suppress_error_toast: false,
            optimization: OptimizationConfig::default(),
        }
    }
}

// ============================================================================
// Request Options
// ============================================================================

/// Call-site overrides for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Log label; defaults to `"{METHOD} {path}"`.
    pub operation: Option<String>,
    /// Logged on success; has no other effect.
    pub success_message: Option<String>,
    /// Handed to the error presenter and failure log.
    pub error_message: Option<String>,
    /// Override [`RequestDefaults::log_request`].
    pub log_request: Option<bool>,
    /// Override [`RequestDefaults::log_response`].
    pub log_response: Option<bool>,
    /// Override [`RequestDefaults::suppress_error_toast`].
    pub suppress_error_toast: Option<bool>,
    /// Optimization overrides.
    pub optimization: OptimizationOverrides,
    /// Transport passthrough.
    pub transport: TransportOptions,
}

impl RequestOptions {
    /// Creates empty options (everything inherited).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log label.
    pub fn operation(mut self, label: impl Into<String>) -> Self {
        self.operation = Some(label.into());
        self
    }

    /// Sets the success log message.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Sets the message handed to the error presenter.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Disables both request and response logging.
    pub fn quiet(mut self) -> Self {
        self.log_request = Some(false);
        self.log_response = Some(false);
        self
    }

    /// Keeps failures away from the error presenter.
    pub fn suppress_error_toast(mut self) -> Self {
        self.suppress_error_toast = Some(true);
        self
    }

    /// Enables or disables caching.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.optimization.enable_cache = Some(enabled);
        self
    }

    /// Enables or disables deduplication.
    pub fn dedupe(mut self, enabled: bool) -> Self {
        self.optimization.enable_deduplication = Some(enabled);
        self
    }

    /// Enables or disables batching for the batch verbs.
    pub fn batching(mut self, enabled: bool) -> Self {
        self.optimization.enable_batching = Some(enabled);
        self
    }

    /// Sets the batch size and window.
    pub fn batch_window(mut self, size: usize, delay: Duration) -> Self {
        self.optimization.batch_size = Some(size);
        self.optimization.batch_delay_ms =
            Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Adds a header. Invalid names or values are ignored with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.transport.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid header"),
        }
        self
    }

    /// Appends a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport.query.push((key.into(), value.into()));
        self
    }

    /// Sets a per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Request Config
// ============================================================================

/// Fully resolved configuration for one call.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Log label.
    pub operation: String,
    /// Logged on success.
    pub success_message: Option<String>,
    /// Handed to the error presenter.
    pub error_message: Option<String>,
    /// Log call start.
    pub log_request: bool,
    /// Log call success.
    pub log_response: bool,
    /// Skip the error presenter.
    pub suppress_error_toast: bool,
    /// Effective optimization settings.
    pub optimization: OptimizationConfig,
    /// Transport passthrough.
    pub transport: TransportOptions,
}

impl RequestConfig {
    /// Merges defaults, verb defaults, any extra layers, then call-site options.
    pub fn resolve(
        defaults: &RequestDefaults,
        verb: Verb,
        path: &str,
        layers: &[OptimizationOverrides],
        options: RequestOptions,
    ) -> Self {
        let mut optimization = defaults.optimization.clone();
        verb.defaults().apply_to(&mut optimization);
        for layer in layers {
            layer.apply_to(&mut optimization);
        }
        options.optimization.apply_to(&mut optimization);

        Self {
            operation: options
                .operation
                .unwrap_or_else(|| format!("{} {}", verb.method(), path)),
            success_message: options.success_message,
            error_message: options.error_message,
            log_request: options.log_request.unwrap_or(defaults.log_request),
            log_response: options.log_response.unwrap_or(defaults.log_response),
            suppress_error_toast: options
                .suppress_error_toast
                .unwrap_or(defaults.suppress_error_toast),
            optimization,
            transport: options.transport,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
