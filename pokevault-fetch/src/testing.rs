//! In-memory transport for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for dependent crates.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::RequestError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

type Handler =
    Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, RequestError> + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// Creates a transport answering with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, RequestError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a transport that always answers with `response`.
    pub fn always(response: TransportResponse) -> Self {
        Self::new(move |_| Ok(response.clone()))
    }

    /// Creates a transport that echoes each JSON body back as envelope data.
    ///
    /// Bodiless requests get `null` data.
    pub fn echo() -> Self {
        Self::new(|request| {
            let data = request
                .body
                .as_ref()
                .and_then(|body| body.as_json().cloned())
                .unwrap_or_default();
            Ok(TransportResponse::envelope(200, data))
        })
    }

    /// Wraps the transport in an [`Arc`], ready for a client builder.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns a snapshot of the requests received so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.lock().clone()
    }

    /// Returns the number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TransportRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, RequestError> {
        let response = (self.handler)(&request);
        self.lock().push(request);
        response
    }
}
