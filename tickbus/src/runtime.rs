//! Runtime - a pool, dispatcher and ticker wired together
//!
//! Most programs want one of each sharing a single pool. [`Runtime::new`]
//! builds that from a [`Config`]; [`Runtime::global`] is a lazily created
//! process-wide instance for code that cannot easily thread a handle through.

use std::sync::OnceLock;

use tracing::{debug, info};

use crate::config::Config;
use crate::events::{Dispatcher, ErrorSink, TracingSink};
use crate::pool::WorkerPool;
use crate::ticker::Ticker;

static GLOBAL: OnceLock<Runtime> = OnceLock::new();

/// Pool, dispatcher and ticker sharing one set of worker threads
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    pool: WorkerPool,
    dispatcher: Dispatcher,
    ticker: Ticker,
}

impl Runtime {
    /// Build a runtime that reports listener failures through `tracing`
    pub fn new(config: &Config) -> Self {
        Self::with_sink(config, TracingSink)
    }

    pub fn with_sink(config: &Config, sink: impl ErrorSink + 'static) -> Self {
        debug!("Runtime::with_sink: called");
        let pool = WorkerPool::new(config.pool.clone());
        let dispatcher = Dispatcher::with_sink(pool.clone(), sink);
        let ticker = Ticker::new(config.ticker.clone(), dispatcher.clone(), pool.clone());
        Self {
            pool,
            dispatcher,
            ticker,
        }
    }

    /// The process-wide runtime, created with default config on first use
    pub fn global() -> &'static Runtime {
        GLOBAL.get_or_init(|| {
            info!("Creating global runtime");
            Runtime::new(&Config::default())
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Stop the ticker, then stop the pool and wait for its workers
    ///
    /// Async dispatches already queued still run.
    pub fn shutdown(&self) {
        debug!("Runtime::shutdown: called");
        self.ticker.stop();
        self.pool.shutdown();
        self.pool.join();
        info!("Runtime shut down");
    }
}
