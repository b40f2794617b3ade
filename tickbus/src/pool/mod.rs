//! Bounded worker pool
//!
//! Runs async event dispatches and hosts the ticker thread. Jobs are either
//! fire-and-forget ([`WorkerPool::submit`]) or produce a [`TaskHandle`]
//! ([`WorkerPool::submit_with_result`]). A full queue with every worker busy
//! rejects the submission with [`PoolError::Saturated`].

mod config;
mod core;
mod error;
mod handle;

pub use config::PoolConfig;
pub use self::core::{PoolStats, WorkerPool};
pub use error::PoolError;
pub(crate) use error::panic_message;
pub use handle::TaskHandle;
