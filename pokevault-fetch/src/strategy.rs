//! Optimization strategy trait and types.
//!
//! A strategy wraps the actual transport invocation of a call and decides
//! whether it is served from cache, collapsed with an identical in-flight
//! call, or sent straight through. Caching and deduplication themselves are
//! implemented by an external [`OptimizingExecutor`]; the strategy only
//! decides when to delegate.
//!
//! The strategy is fixed when the client is built, so a call in flight can
//! never observe a different policy than the one it started with.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::Value;
use tracing::trace;

use crate::config::OptimizationConfig;
use crate::error::RequestError;
use crate::transport::{TransportRequest, TransportResponse};

// ============================================================================
// Execute Function & Hints
// ============================================================================

/// The deferred transport invocation of one call.
///
/// Resolves to a 2xx response; non-2xx statuses are already errors, so
/// executors never cache failures.
pub type ExecuteFn =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<TransportResponse, RequestError>> + Send>;

/// What an executor may use to build cache and deduplication keys.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHints {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Query pairs.
    pub query: Vec<(String, String)>,
    /// JSON body, if any. Binary bodies are not represented.
    pub body: Option<Value>,
}

impl From<&TransportRequest> for RequestHints {
    fn from(request: &TransportRequest) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.as_ref().and_then(|b| b.as_json().cloned()),
        }
    }
}

// ============================================================================
// Optimizing Executor
// ============================================================================

/// External caching/deduplication executor.
///
/// Must return exactly what `execute` would have returned, possibly from a
/// cache or a shared in-flight call.
#[async_trait]
pub trait OptimizingExecutor: Send + Sync {
    /// Runs `execute` under the caching/deduplication policy in `config`.
    async fn execute(
        &self,
        execute: ExecuteFn,
        hints: &RequestHints,
        config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError>;
}

// ============================================================================
// Optimization Strategy Trait
// ============================================================================

/// A policy wrapping every call's transport invocation.
#[async_trait]
pub trait OptimizationStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Runs `execute`, optionally through caching or deduplication.
    async fn optimize(
        &self,
        execute: ExecuteFn,
        hints: &RequestHints,
        config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError>;
}

// ============================================================================
// Pass-Through Strategy
// ============================================================================

/// Always invokes `execute` directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl OptimizationStrategy for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    async fn optimize(
        &self,
        execute: ExecuteFn,
        _hints: &RequestHints,
        _config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError> {
        execute().await
    }
}

// ============================================================================
// Default Strategy
// ============================================================================

/// Delegates to an [`OptimizingExecutor`] when caching or deduplication is
/// enabled for the call; otherwise invokes `execute` directly.
#[derive(Clone, Default)]
pub struct DefaultStrategy {
    executor: Option<Arc<dyn OptimizingExecutor>>,
}

impl DefaultStrategy {
    /// Creates a strategy without an executor (behaves like [`PassThrough`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a strategy delegating to `executor`.
    pub fn with_executor(executor: Arc<dyn OptimizingExecutor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }
}

impl fmt::Debug for DefaultStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultStrategy")
            .field("has_executor", &self.executor.is_some())
            .finish()
    }
}

#[async_trait]
impl OptimizationStrategy for DefaultStrategy {
    fn name(&self) -> &str {
        "default"
    }

    async fn optimize(
        &self,
        execute: ExecuteFn,
        hints: &RequestHints,
        config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError> {
        match &self.executor {
            Some(executor) if config.wants_executor() => {
                trace!(
                    path = %hints.path,
                    cache = config.enable_cache,
                    dedupe = config.enable_deduplication,
                    "Delegating to optimizing executor"
                );
                executor.execute(execute, hints, config).await
            }
            _ => execute().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OptimizingExecutor for CountingExecutor {
        async fn execute(
            &self,
            execute: ExecuteFn,
            _hints: &RequestHints,
            _config: &OptimizationConfig,
        ) -> Result<TransportResponse, RequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            execute().await
        }
    }

    fn ok_fn() -> ExecuteFn {
        Box::new(|| Box::pin(async { Ok(TransportResponse::empty(204)) }))
    }

    fn hints() -> RequestHints {
        RequestHints::from(&TransportRequest::new(Method::GET, "/cards"))
    }

    #[tokio::test]
    async fn test_default_strategy_delegates_when_enabled() {
        let executor = Arc::new(CountingExecutor::default());
        let strategy = DefaultStrategy::with_executor(executor.clone());

        let config = OptimizationConfig {
            enable_cache: true,
            ..Default::default()
        };
        strategy.optimize(ok_fn(), &hints(), &config).await.unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

        let config = OptimizationConfig {
            enable_deduplication: true,
            ..Default::default()
        };
        strategy.optimize(ok_fn(), &hints(), &config).await.unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_strategy_passes_through_when_disabled() {
        let executor = Arc::new(CountingExecutor::default());
        let strategy = DefaultStrategy::with_executor(executor.clone());

        let resp = strategy
            .optimize(ok_fn(), &hints(), &OptimizationConfig::default())
            .await
            .unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_executor_passes_through() {
        let config = OptimizationConfig {
            enable_cache: true,
            ..Default::default()
        };
        let resp = DefaultStrategy::new()
            .optimize(ok_fn(), &hints(), &config)
            .await
            .unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(PassThrough.name(), "pass-through");
    }
}
