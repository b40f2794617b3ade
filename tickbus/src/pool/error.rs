//! Worker pool error types

use thiserror::Error;

/// Errors surfaced to callers submitting work to the pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Worker pool saturated: {queued} jobs queued and all {workers} workers busy")]
    Saturated { queued: usize, workers: usize },

    #[error("Worker pool is shut down")]
    ShutDown,

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("Job was dropped before producing a result")]
    Cancelled,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl PoolError {
    /// Check if this is a saturation rejection
    pub fn is_saturated(&self) -> bool {
        matches!(self, PoolError::Saturated { .. })
    }
}

/// Render a caught panic payload as text
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
