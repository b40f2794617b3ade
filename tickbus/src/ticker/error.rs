//! Ticker error types

use thiserror::Error;

use crate::pool::PoolError;

use super::state::TickerState;
use super::task::TaskId;

/// Errors returned to callers driving the ticker
#[derive(Debug, Error)]
pub enum TickerError {
    #[error("Ticker cannot start while {state}")]
    AlreadyRunning { state: TickerState },

    #[error("Periodic task period must be at least one millisecond")]
    ZeroPeriod,

    #[error("Failed to host ticker loop: {0}")]
    Pool(#[from] PoolError),
}

/// A failure inside one tick iteration
///
/// Carried by [`TickInterruptedEvent`](super::TickInterruptedEvent) rather
/// than returned to anyone.
#[derive(Debug, Error)]
pub enum TickFault {
    #[error("Periodic task {task} panicked: {message}")]
    TaskPanicked { task: TaskId, message: String },

    #[error("Periodic task {task} failed: {report}")]
    TaskFailed { task: TaskId, report: eyre::Report },
}

impl TickFault {
    /// The task that caused the fault
    pub fn task(&self) -> TaskId {
        match self {
            TickFault::TaskPanicked { task, .. } | TickFault::TaskFailed { task, .. } => *task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_message() {
        let err = TickerError::AlreadyRunning {
            state: TickerState::Stopping,
        };
        assert_eq!(err.to_string(), "Ticker cannot start while stopping");
    }

    #[test]
    fn test_pool_error_converts() {
        let err: TickerError = PoolError::ShutDown.into();
        assert!(matches!(err, TickerError::Pool(PoolError::ShutDown)));
    }

    #[test]
    fn test_fault_messages() {
        let fault = TickFault::TaskPanicked {
            task: TaskId(3),
            message: "oops".to_string(),
        };
        assert_eq!(fault.to_string(), "Periodic task task-3 panicked: oops");
        assert_eq!(fault.task(), TaskId(3));

        let fault = TickFault::TaskFailed {
            task: TaskId(4),
            report: eyre::eyre!("no route"),
        };
        assert!(fault.to_string().ends_with("failed: no route"));
    }
}
