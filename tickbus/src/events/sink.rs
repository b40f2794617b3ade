//! Error sink - where listener failures go instead of back to the producer

use tracing::error;

use super::error::DispatchError;
use super::listener::ListenerId;

/// One failed listener invocation
#[derive(Debug)]
pub struct DispatchFailure {
    /// The event's diagnostic name
    pub event_name: String,
    /// Concrete type of the dispatched event
    pub event_kind: &'static str,
    /// Kind the failing listener was registered for (the event's own or an ancestor)
    pub listener_kind: &'static str,
    pub listener: ListenerId,
    pub error: DispatchError,
}

/// Receives listener failures reported during dispatch
///
/// Implemented for any `Fn(&DispatchFailure) + Send + Sync`, so a closure can
/// be used directly.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: &DispatchFailure);
}

impl<F> ErrorSink for F
where
    F: Fn(&DispatchFailure) + Send + Sync,
{
    fn report(&self, failure: &DispatchFailure) {
        self(failure)
    }
}

/// Default sink: one `error!` record per failure
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, failure: &DispatchFailure) {
        error!(
            event = %failure.event_name,
            event_kind = failure.event_kind,
            listener_kind = failure.listener_kind,
            listener = %failure.listener,
            error = %failure.error,
            "Listener invocation failed"
        );
    }
}
