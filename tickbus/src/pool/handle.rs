//! TaskHandle - result handle for jobs submitted with `submit_with_result`

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::debug;

use super::error::PoolError;

/// Handle to the eventual result of a pooled job
///
/// Either block on it with [`TaskHandle::join`] from a plain thread, or
/// `.await` it from async code. A job that panicked resolves to
/// [`PoolError::Panicked`].
#[must_use = "dropping a TaskHandle discards the job's result"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, PoolError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, PoolError>>) -> Self {
        Self { rx }
    }

    /// Block the current thread until the job finishes
    ///
    /// Must not be called from inside an async runtime; `.await` the handle there.
    pub fn join(self) -> Result<T, PoolError> {
        debug!("TaskHandle::join: called");
        self.rx.blocking_recv().unwrap_or(Err(PoolError::Cancelled))
    }

    /// Poll for the result without blocking
    ///
    /// Returns `None` while the job is still queued or running.
    pub fn try_join(&mut self) -> Option<Result<T, PoolError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(PoolError::Cancelled)),
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(PoolError::Cancelled)))
    }
}
