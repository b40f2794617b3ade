//! Dispatcher - typed listener registry and delivery engine

use std::any::{TypeId, type_name};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::pool::{PoolError, TaskHandle, WorkerPool, panic_message};

use super::error::DispatchError;
use super::event::{Event, Upcast};
use super::listener::{ListenerId, ListenerOutcome, ListenerSet, PendingListener, Subscriber, erase};
use super::registry::Registry;
use super::sink::{DispatchFailure, ErrorSink, TracingSink};

struct DispatcherInner {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    sink: Arc<dyn ErrorSink>,
    pool: WorkerPool,
}

/// Routes events to every listener registered for the event's kind or any of
/// its ancestor kinds
///
/// Delivery is sequential on the dispatching thread: buckets in creation
/// order, listeners in registration order within a bucket. Each dispatch works
/// on a snapshot of the registry, so a listener registered mid-dispatch is
/// first seen by the next dispatch. Listener panics and errors go to the
/// [`ErrorSink`] and never reach the producer.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher that logs listener failures through `tracing`
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_sink(pool, TracingSink)
    }

    /// Create a dispatcher with a custom error sink
    pub fn with_sink(pool: WorkerPool, sink: impl ErrorSink + 'static) -> Self {
        debug!("Dispatcher::with_sink: called");
        Self {
            inner: Arc::new(DispatcherInner {
                registry: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                sink: Arc::new(sink),
                pool,
            }),
        }
    }

    /// The pool used for async dispatch
    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Register a listener for event kind `E`
    ///
    /// Registering the same closure twice yields two handles and two
    /// invocations per dispatch.
    pub fn register<E, F, O>(&self, listener: F) -> ListenerId
    where
        E: Event,
        F: Fn(&mut E) -> O + Send + Sync + 'static,
        O: ListenerOutcome,
    {
        self.insert(PendingListener {
            kind: TypeId::of::<E>(),
            kind_name: type_name::<E>(),
            listener: erase(listener),
        })
    }

    /// Remove a listener from the `E` bucket
    ///
    /// Returns false if there is no such bucket or the handle is not in it.
    pub fn unregister<E: Event>(&self, id: ListenerId) -> bool {
        let removed = self.inner.registry.write().remove(TypeId::of::<E>(), id);
        debug!(kind = type_name::<E>(), %id, removed, "Dispatcher::unregister: called");
        removed
    }

    /// Register every listener in a set, in order
    pub fn register_all(&self, set: ListenerSet) -> Vec<ListenerId> {
        debug!(count = set.len(), "Dispatcher::register_all: called");
        set.into_entries().into_iter().map(|pending| self.insert(pending)).collect()
    }

    /// Register the listeners a shared subscriber hands out
    pub fn register_subscriber<S: Subscriber>(&self, subscriber: Arc<S>) -> Vec<ListenerId> {
        debug!(subscriber = type_name::<S>(), "Dispatcher::register_subscriber: called");
        self.register_all(subscriber.listeners())
    }

    /// Listeners currently in the `E` bucket (ancestor buckets not counted)
    pub fn listener_count<E: Event>(&self) -> usize {
        self.inner.registry.read().listener_count(TypeId::of::<E>())
    }

    /// Buckets created so far; emptied buckets still count
    pub fn bucket_count(&self) -> usize {
        self.inner.registry.read().bucket_count()
    }

    /// Deliver an event and return its final result
    pub fn dispatch<E: Event>(&self, mut event: E) -> Option<E::Output> {
        self.dispatch_mut(&mut event);
        event.result_mut().take()
    }

    /// Deliver an event if there is one; `None` invokes nothing
    pub fn dispatch_opt<E: Event>(&self, event: Option<E>) -> Option<E::Output> {
        event.and_then(|event| self.dispatch(event))
    }

    /// Deliver an event the caller keeps ownership of
    pub fn dispatch_mut<E: Event>(&self, event: &mut E) {
        let deliveries = self.inner.registry.read().matching(event);
        debug!(
            event = event.name(),
            kind = type_name::<E>(),
            listeners = deliveries.len(),
            "Dispatcher::dispatch: called"
        );

        for delivery in deliveries {
            let Some(view) = event.view_mut(delivery.kind) else {
                continue;
            };
            let error = match panic::catch_unwind(AssertUnwindSafe(|| (delivery.listener)(view))) {
                Ok(Ok(())) => continue,
                Ok(Err(report)) => DispatchError::Failed(report),
                Err(payload) => DispatchError::Panicked(panic_message(payload.as_ref())),
            };
            let failure = DispatchFailure {
                event_name: event.name().to_string(),
                event_kind: type_name::<E>(),
                listener_kind: delivery.kind_name,
                listener: delivery.id,
                error,
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.inner.sink.report(&failure))) {
                error!(
                    event = %failure.event_name,
                    listener = %failure.listener,
                    panic = %panic_message(payload.as_ref()),
                    "Error sink panicked; failure dropped"
                );
            }
        }
    }

    /// Deliver an event on a pool thread, then hand its result to `on_result`
    ///
    /// Fails only if the pool rejects the job.
    pub fn dispatch_async<E, S>(&self, event: E, on_result: S) -> Result<(), PoolError>
    where
        E: Event,
        S: FnOnce(Option<E::Output>) + Send + 'static,
    {
        debug!(event = event.name(), kind = type_name::<E>(), "Dispatcher::dispatch_async: called");
        let dispatcher = self.clone();
        self.inner.pool.submit(move || on_result(dispatcher.dispatch(event)))
    }

    /// Deliver an event on a pool thread and get a handle to its result
    pub fn dispatch_with_handle<E: Event>(&self, event: E) -> Result<TaskHandle<Option<E::Output>>, PoolError> {
        debug!(event = event.name(), kind = type_name::<E>(), "Dispatcher::dispatch_with_handle: called");
        let dispatcher = self.clone();
        self.inner.pool.submit_with_result(move || dispatcher.dispatch(event))
    }

    fn insert(&self, pending: PendingListener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(kind = pending.kind_name, %id, "Dispatcher::register: called");
        self.inner.registry.write().insert(id, pending);
        id
    }
}
