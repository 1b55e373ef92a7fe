//! Request-coalescing batch processor.
//!
//! A [`BatchProcessor`] collects single items submitted close together and
//! hands them to one bulk flush function. Flush triggers, in precedence
//! order:
//!
//! 1. The queue reaches `batch_size`: flush immediately and cancel the timer.
//! 2. `batch_delay` elapses with items still queued: flush whatever is queued.
//!
//! Results are delivered positionally: output `i` of the flush goes to the
//! caller that submitted input `i`. If the flush fails, every caller in that
//! flush receives the same [`Arc`]'d error.
//!
//! Flushes run on their own Tokio task, so a caller that stops awaiting its
//! ticket does not stop the batch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use pokevault_core::TransformError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::RequestError;

/// Bulk execution function: receives inputs in arrival order and must
/// return outputs of the same length and order.
pub type FlushFn<I, O> =
    Arc<dyn Fn(Vec<I>) -> BoxFuture<'static, Result<Vec<O>, RequestError>> + Send + Sync>;

type Slot<O> = oneshot::Sender<Result<O, Arc<RequestError>>>;

// ============================================================================
// Batch Ticket
// ============================================================================

/// Deferred result of one item submitted to a [`BatchProcessor`].
#[must_use = "a ticket does nothing unless awaited"]
pub struct BatchTicket<O> {
    rx: oneshot::Receiver<Result<O, Arc<RequestError>>>,
}

impl<O> Future for BatchTicket<O> {
    type Output = Result<O, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(shared)) => Err(RequestError::BatchExecution(shared)),
            Err(_) => Err(RequestError::BatchAborted),
        })
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

struct Pending<I, O> {
    item: I,
    slot: Slot<O>,
}

struct State<I, O> {
    queue: Vec<Pending<I, O>>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the queue is taken; a timer only flushes its own epoch.
    epoch: u64,
}

struct Shared<I, O> {
    label: String,
    flush: FlushFn<I, O>,
    batch_size: usize,
    batch_delay: Duration,
    state: Mutex<State<I, O>>,
}

/// Coalesces single items into bulk flushes.
///
/// Cloning is cheap; clones share the same queue.
pub struct BatchProcessor<I, O> {
    shared: Arc<Shared<I, O>>,
}

impl<I, O> Clone for BatchProcessor<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I, O> fmt::Debug for BatchProcessor<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("label", &self.shared.label)
            .field("batch_size", &self.shared.batch_size)
            .field("batch_delay", &self.shared.batch_delay)
            .finish_non_exhaustive()
    }
}

impl<I, O> BatchProcessor<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a processor. A `batch_size` of zero is treated as one.
    pub fn new(
        label: impl Into<String>,
        flush: FlushFn<I, O>,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                flush,
                batch_size: batch_size.max(1),
                batch_delay,
                state: Mutex::new(State {
                    queue: Vec::new(),
                    timer: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Queues `item` and returns a ticket for its result.
    ///
    /// The item is queued immediately, before the ticket is polled.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn add(&self, item: I) -> BatchTicket<O> {
        let (slot, rx) = oneshot::channel();

        let ready = {
            let mut state = self.shared.lock();
            state.queue.push(Pending { item, slot });
            trace!(batch = %self.shared.label, queued = state.queue.len(), "Item queued");

            if state.queue.len() >= self.shared.batch_size {
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                Some(state.take_queue())
            } else {
                if state.timer.is_none() {
                    state.timer = Some(self.arm_timer(state.epoch));
                }
                None
            }
        };

        if let Some(batch) = ready {
            debug!(batch = %self.shared.label, size = batch.len(), "Batch full, flushing");
            tokio::spawn(Shared::flush(Arc::clone(&self.shared), batch));
        }

        BatchTicket { rx }
    }

    /// Returns the number of queued, unflushed items.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Returns the flush threshold.
    pub fn batch_size(&self) -> usize {
        self.shared.batch_size
    }

    /// Returns the batch window length.
    pub fn batch_delay(&self) -> Duration {
        self.shared.batch_delay
    }

    fn arm_timer(&self, epoch: u64) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.batch_delay).await;

            let batch = {
                let mut state = shared.lock();
                if state.epoch != epoch {
                    return;
                }
                state.timer = None;
                state.take_queue()
            };

            if !batch.is_empty() {
                debug!(batch = %shared.label, size = batch.len(), "Batch window elapsed, flushing");
                Shared::flush(shared, batch).await;
            }
        })
    }
}

impl<I, O> State<I, O> {
    fn take_queue(&mut self) -> Vec<Pending<I, O>> {
        self.epoch = self.epoch.wrapping_add(1);
        std::mem::take(&mut self.queue)
    }
}

impl<I, O> Shared<I, O> {
    fn lock(&self) -> MutexGuard<'_, State<I, O>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn flush(shared: Arc<Self>, batch: Vec<Pending<I, O>>) {
        let expected = batch.len();
        let (items, slots): (Vec<I>, Vec<Slot<O>>) =
            batch.into_iter().map(|p| (p.item, p.slot)).unzip();

        let result = (shared.flush)(items).await.and_then(|outputs| {
            if outputs.len() == expected {
                Ok(outputs)
            } else {
                Err(RequestError::Transform(TransformError::UnexpectedShape(
                    format!(
                        "batch of {expected} produced {} results",
                        outputs.len()
                    ),
                )))
            }
        });

        match result {
            Ok(outputs) => {
                trace!(batch = %shared.label, size = expected, "Batch delivered");
                for (slot, output) in slots.into_iter().zip(outputs) {
                    // The caller may have stopped waiting.
                    let _ = slot.send(Ok(output));
                }
            }
            Err(error) => {
                warn!(batch = %shared.label, size = expected, error = %error, "Batch flush failed");
                let error = Arc::new(error);
                for slot in slots {
                    let _ = slot.send(Err(Arc::clone(&error)));
                }
            }
        }
    }
}

// ============================================================================
// Batch Registry
// ============================================================================

/// Structural identity of a batch processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Which bulk operation the processor flushes into (e.g. `"fetch"`).
    pub operation: String,
    /// Resource base path.
    pub base: String,
    /// Flush threshold.
    pub batch_size: usize,
    /// Batch window in milliseconds.
    pub batch_delay_ms: u64,
    /// Fingerprint of the transport and logging options the flush inherits.
    pub scope: u64,
}

/// Get-or-create registry of processors, one per [`BatchKey`].
///
/// Processors are created lazily and live as long as the registry.
pub struct BatchRegistry<I, O> {
    processors: Mutex<HashMap<BatchKey, BatchProcessor<I, O>>>,
}

impl<I, O> Default for BatchRegistry<I, O> {
    fn default() -> Self {
        Self {
            processors: Mutex::new(HashMap::new()),
        }
    }
}

impl<I, O> fmt::Debug for BatchRegistry<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRegistry")
            .field("processors", &self.len())
            .finish()
    }
}

impl<I, O> BatchRegistry<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the processor for `key`, creating it with `make_flush` on first use.
    pub fn get_or_create(
        &self,
        key: BatchKey,
        make_flush: impl FnOnce() -> FlushFn<I, O>,
    ) -> BatchProcessor<I, O> {
        let mut processors = self
            .processors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        processors
            .entry(key)
            .or_insert_with_key(|key| {
                debug!(operation = %key.operation, base = %key.base, "Creating batch processor");
                BatchProcessor::new(
                    format!("{} {}", key.operation, key.base),
                    make_flush(),
                    key.batch_size,
                    Duration::from_millis(key.batch_delay_ms),
                )
            })
            .clone()
    }
}

impl<I, O> BatchRegistry<I, O> {
    /// Returns the number of processors created so far.
    pub fn len(&self) -> usize {
        self.processors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no processor has been created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doubling(calls: Arc<AtomicUsize>) -> FlushFn<u32, u32> {
        Arc::new(move |items: Vec<u32>| -> BoxFuture<'static, Result<Vec<u32>, RequestError>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(items.into_iter().map(|i| i * 2).collect()) })
        })
    }

    fn key(op: &str, size: usize) -> BatchKey {
        BatchKey {
            operation: op.into(),
            base: "/cards".into(),
            batch_size: size,
            batch_delay_ms: 50,
            scope: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_flushes_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor =
            BatchProcessor::new("t", doubling(calls.clone()), 2, Duration::from_secs(60));

        let a = processor.add(1);
        let b = processor.add(2);
        assert_eq!(processor.pending(), 0);

        assert_eq!(a.await.unwrap(), 2);
        assert_eq!(b.await.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_length_mismatch_rejects_all() {
        let flush: FlushFn<u32, u32> = Arc::new(
            |_: Vec<u32>| -> BoxFuture<'static, Result<Vec<u32>, RequestError>> {
                Box::pin(async { Ok(vec![1]) })
            },
        );
        let processor = BatchProcessor::new("t", flush, 2, Duration::from_millis(10));

        let (a, b) = tokio::join!(processor.add(1), processor.add(2));
        let a = a.unwrap_err();
        let b = b.unwrap_err();
        assert!(Arc::ptr_eq(a.batch_cause().unwrap(), b.batch_cause().unwrap()));
        assert!(matches!(
            **a.batch_cause().unwrap(),
            RequestError::Transform(TransformError::UnexpectedShape(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_get_or_create() {
        let registry: BatchRegistry<u32, u32> = BatchRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = registry.get_or_create(key("fetch", 3), || doubling(calls.clone()));
        let again = registry.get_or_create(key("fetch", 3), || panic!("must reuse"));
        assert!(Arc::ptr_eq(&first.shared, &again.shared));

        registry.get_or_create(key("fetch", 4), || doubling(calls.clone()));
        registry.get_or_create(key("create", 3), || doubling(calls.clone()));
        let scoped = BatchKey {
            scope: 7,
            ..key("fetch", 3)
        };
        registry.get_or_create(scoped, || doubling(calls.clone()));
        assert_eq!(registry.len(), 4);
    }
}
