//! Worker pool implementation

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::config::PoolConfig;
use super::error::{PoolError, panic_message};
use super::handle::TaskHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared with worker threads
///
/// Workers never hold the sender, so dropping the last [`WorkerPool`] handle
/// disconnects the queue and lets them drain and exit.
struct Workers {
    config: PoolConfig,
    receiver: Receiver<Job>,
    live: AtomicUsize,
    idle: AtomicUsize,
    next_id: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct PoolShared {
    sender: RwLock<Option<Sender<Job>>>,
    workers: Arc<Workers>,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Worker threads currently alive
    pub live: usize,
    /// Workers blocked waiting for a job
    pub idle: usize,
    /// Jobs accepted but not yet started
    pub queued: usize,
}

/// Bounded thread pool for fire-and-forget and result-producing jobs
///
/// Up to `core_threads` workers are started on demand and stay alive. Once the
/// queue is full, extra workers are started up to `max_threads`; those exit
/// after `keep_alive` without work. With every worker busy and the queue full,
/// submissions fail with [`PoolError::Saturated`].
///
/// Cheap to clone; all clones share the same workers.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Create a pool with the given configuration
    pub fn new(config: PoolConfig) -> Self {
        debug!(?config, "WorkerPool::new: called");
        let (sender, receiver) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        Self {
            shared: Arc::new(PoolShared {
                sender: RwLock::new(Some(sender)),
                workers: Arc::new(Workers {
                    config,
                    receiver,
                    live: AtomicUsize::new(0),
                    idle: AtomicUsize::new(0),
                    next_id: AtomicUsize::new(0),
                    handles: Mutex::new(Vec::new()),
                }),
            }),
        }
    }

    /// Create a pool with default limits (3 core, 10 max, 1s keep-alive, 50 queued)
    pub fn with_defaults() -> Self {
        Self::new(PoolConfig::default())
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.shared.workers.config
    }

    /// Submit a fire-and-forget job
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("WorkerPool::submit: called");
        self.enqueue(Box::new(job))
    }

    /// Submit a job and get a handle to its result
    ///
    /// Saturation is reported here, not through the handle.
    pub fn submit_with_result<T, F>(&self, job: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        debug!("WorkerPool::submit_with_result: called");
        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job))
                .map_err(|payload| PoolError::Panicked(panic_message(payload.as_ref())));
            // Receiver may have been dropped; nobody is waiting then
            let _ = tx.send(outcome);
        }))?;
        Ok(TaskHandle::new(rx))
    }

    /// Stop accepting new jobs
    ///
    /// Queued and running jobs still complete. Idempotent.
    pub fn shutdown(&self) {
        debug!("WorkerPool::shutdown: called");
        if self.shared.sender.write().take().is_some() {
            info!(queued = self.shared.workers.receiver.len(), "Worker pool shutting down");
        }
    }

    /// Check whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shared.sender.read().is_none()
    }

    /// Wait for every worker to exit
    ///
    /// Only returns after `shutdown` once the queue has drained. Calling it from
    /// a pool thread deadlocks.
    pub fn join(&self) {
        debug!("WorkerPool::join: called");
        loop {
            let handles = std::mem::take(&mut *self.shared.workers.handles.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if handle.join().is_err() {
                    warn!("WorkerPool::join: worker thread panicked");
                }
            }
        }
    }

    /// Get current occupancy
    pub fn stats(&self) -> PoolStats {
        let workers = &self.shared.workers;
        PoolStats {
            live: workers.live.load(Ordering::SeqCst),
            idle: workers.idle.load(Ordering::SeqCst),
            queued: workers.receiver.len(),
        }
    }

    fn enqueue(&self, job: Job) -> Result<(), PoolError> {
        let guard = self.shared.sender.read();
        let Some(sender) = guard.as_ref() else {
            debug!("WorkerPool::enqueue: pool is shut down, rejecting");
            return Err(PoolError::ShutDown);
        };

        let workers = &self.shared.workers;
        match sender.try_send(job) {
            Ok(()) => {
                let live = workers.live.load(Ordering::SeqCst);
                if live < workers.config.core_threads || live == 0 {
                    debug!(live, "WorkerPool::enqueue: below core size, starting worker");
                    let limit = workers.config.core_threads.max(1);
                    if reserve_worker(workers, limit) {
                        if let Err(e) = spawn_worker(workers, None) {
                            warn!(error = %e, "Failed to start core worker; job stays queued");
                        }
                    }
                }
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                if reserve_worker(workers, workers.config.max_threads) {
                    debug!("WorkerPool::enqueue: queue full, starting extra worker");
                    spawn_worker(workers, Some(job))?;
                    return Ok(());
                }
                let err = PoolError::Saturated {
                    queued: workers.receiver.len(),
                    workers: workers.live.load(Ordering::SeqCst),
                };
                warn!(%err, "WorkerPool::enqueue: rejecting job");
                Err(err)
            }
            Err(TrySendError::Disconnected(_)) => Err(PoolError::ShutDown),
        }
    }
}

/// Claim a worker slot if fewer than `limit` workers are alive
fn reserve_worker(workers: &Workers, limit: usize) -> bool {
    workers
        .live
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < limit).then_some(n + 1))
        .is_ok()
}

/// Start a worker thread for an already reserved slot
fn spawn_worker(workers: &Arc<Workers>, first: Option<Job>) -> Result<(), PoolError> {
    let id = workers.next_id.fetch_add(1, Ordering::SeqCst);
    let name = format!("{}-{}", workers.config.thread_name, id);
    debug!(%name, "spawn_worker: called");

    let shared = Arc::clone(workers);
    let spawned = thread::Builder::new().name(name).spawn(move || worker_loop(shared, first));

    match spawned {
        Ok(handle) => {
            let mut handles = workers.handles.lock();
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
            Ok(())
        }
        Err(e) => {
            workers.live.fetch_sub(1, Ordering::SeqCst);
            Err(PoolError::Spawn(e))
        }
    }
}

fn worker_loop(workers: Arc<Workers>, first: Option<Job>) {
    debug!("worker_loop: started");
    if let Some(job) = first {
        run_job(job);
    }

    let core = workers.config.core_threads;
    let keep_alive = workers.config.keep_alive();
    loop {
        workers.idle.fetch_add(1, Ordering::SeqCst);
        let next = if workers.live.load(Ordering::SeqCst) > core {
            match workers.receiver.recv_timeout(keep_alive) {
                Ok(job) => Some(job),
                Err(RecvTimeoutError::Timeout) => {
                    workers.idle.fetch_sub(1, Ordering::SeqCst);
                    let retired = workers
                        .live
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n > core).then_some(n - 1))
                        .is_ok();
                    if retired {
                        // A job queued between the timeout and the retirement saw us as live
                        if !workers.receiver.is_empty() && reserve_worker(&workers, workers.config.max_threads) {
                            debug!("worker_loop: work arrived while retiring, staying");
                            continue;
                        }
                        debug!("worker_loop: idle above core size, retiring");
                        return;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            }
        } else {
            workers.receiver.recv().ok()
        };
        workers.idle.fetch_sub(1, Ordering::SeqCst);

        match next {
            Some(job) => run_job(job),
            None => break,
        }
    }

    workers.live.fetch_sub(1, Ordering::SeqCst);
    debug!("worker_loop: queue disconnected, exiting");
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(panic = %panic_message(payload.as_ref()), "Pooled job panicked");
    }
}
