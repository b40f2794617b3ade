//! Dispatch error types

use thiserror::Error;

/// A listener failure caught during dispatch
///
/// Never returned to the producer; handed to the dispatcher's error sink.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Listener panicked: {0}")]
    Panicked(String),

    #[error("Listener failed: {0}")]
    Failed(eyre::Report),
}

impl DispatchError {
    /// Check if the listener unwound rather than returning an error
    pub fn is_panic(&self) -> bool {
        matches!(self, DispatchError::Panicked(_))
    }
}
