//! Ticker implementation

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, info_span, warn};

use crate::events::{Dispatcher, ListenerOutcome};
use crate::pool::{WorkerPool, panic_message};

use super::config::TickerConfig;
use super::error::{TickFault, TickerError};
use super::events::{StopReason, TickEvent, TickInterruptedEvent, TickerStoppedEvent};
use super::pacing::{Pacer, next_tick};
use super::state::{AtomicState, TickerState};
use super::task::{Period, PeriodicTask, TaskId};

struct TickerInner {
    config: TickerConfig,
    dispatcher: Dispatcher,
    pool: WorkerPool,
    state: AtomicState,
    tick: AtomicI64,
    tasks: RwLock<Vec<Arc<PeriodicTask>>>,
    next_task_id: AtomicU64,
    loop_thread: Mutex<Option<ThreadId>>,
}

/// Fixed-rate loop hosted on a worker pool thread
///
/// Each iteration runs the due periodic tasks, dispatches a [`TickEvent`],
/// advances the tick counter and sleeps off whatever is left of the period.
/// A failing task turns into a [`TickInterruptedEvent`]. Every exit dispatches
/// one [`TickerStoppedEvent`].
///
/// Cheap to clone; all clones drive the same loop.
#[derive(Clone)]
pub struct Ticker {
    inner: Arc<TickerInner>,
}

impl Ticker {
    /// Create an idle ticker dispatching through `dispatcher` and hosted on `pool`
    pub fn new(config: TickerConfig, dispatcher: Dispatcher, pool: WorkerPool) -> Self {
        debug!(?config, "Ticker::new: called");
        Self {
            inner: Arc::new(TickerInner {
                config,
                dispatcher,
                pool,
                state: AtomicState::new(TickerState::Idle),
                tick: AtomicI64::new(0),
                tasks: RwLock::new(Vec::new()),
                next_task_id: AtomicU64::new(1),
                loop_thread: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &TickerConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn state(&self) -> TickerState {
        self.inner.state.load()
    }

    /// True from `start` until the loop has fully exited
    pub fn is_running(&self) -> bool {
        self.state() != TickerState::Idle
    }

    /// Tick number of the most recent iteration
    pub fn current_tick(&self) -> i64 {
        self.inner.tick.load(Ordering::SeqCst)
    }

    /// Attach a task fired on every tick that is a multiple of `period` in milliseconds
    ///
    /// Every task fires on tick 0.
    pub fn schedule<F, O>(&self, period: Period, task: F) -> Result<TaskId, TickerError>
    where
        F: Fn(i64) -> O + Send + Sync + 'static,
        O: ListenerOutcome,
    {
        let id = TaskId(self.inner.next_task_id.fetch_add(1, Ordering::Relaxed));
        let task = PeriodicTask::new(id, period, task)?;
        debug!(task = %id, %period, "Ticker::schedule: called");
        self.inner.tasks.write().push(Arc::new(task));
        Ok(id)
    }

    /// Detach a task; false if it was not attached
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut tasks = self.inner.tasks.write();
        let before = tasks.len();
        tasks.retain(|t| t.id() != id);
        let removed = before != tasks.len();
        debug!(task = %id, removed, "Ticker::cancel: called");
        removed
    }

    pub fn task_count(&self) -> usize {
        self.inner.tasks.read().len()
    }

    /// Start the loop on a pool thread
    ///
    /// Fails with [`TickerError::AlreadyRunning`] unless the ticker is idle.
    /// The tick counter restarts at 0.
    pub fn start(&self) -> Result<(), TickerError> {
        debug!("Ticker::start: called");
        self.inner
            .state
            .transition(TickerState::Idle, TickerState::Running)
            .map_err(|state| TickerError::AlreadyRunning { state })?;
        self.inner.tick.store(0, Ordering::SeqCst);

        let ticker = self.clone();
        if let Err(e) = self.inner.pool.submit(move || ticker.run_loop()) {
            warn!(error = %e, "Ticker::start: pool rejected the loop");
            self.inner.state.store(TickerState::Idle);
            return Err(e.into());
        }
        info!(
            ticker = %self.inner.config.name,
            period_ms = self.inner.config.period_ms(),
            "Ticker started"
        );
        Ok(())
    }

    /// Stop the loop and wait until it has exited
    ///
    /// Returns immediately when idle. Called from the loop thread itself (a
    /// tick listener or task), it only requests the stop.
    pub fn stop(&self) {
        debug!("Ticker::stop: called");
        match self.inner.state.transition(TickerState::Running, TickerState::Stopping) {
            Ok(()) => info!(ticker = %self.inner.config.name, "Ticker stop requested"),
            Err(TickerState::Idle) => return,
            Err(_) => {}
        }

        if *self.inner.loop_thread.lock() == Some(thread::current().id()) {
            debug!("Ticker::stop: called from the loop thread, not waiting");
            return;
        }
        while self.inner.state.load() != TickerState::Idle {
            std::hint::spin_loop();
        }
    }

    fn run_loop(&self) {
        let inner = &self.inner;
        let span = info_span!("ticker", ticker = %inner.config.name);
        let _enter = span.enter();
        let _guard = LoopGuard::enter(inner);

        let reason = match panic::catch_unwind(AssertUnwindSafe(|| self.tick_until_exit())) {
            Ok(reason) => reason,
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Ticker loop panicked");
                StopReason::Interrupted
            }
        };

        let last_tick = inner.tick.load(Ordering::SeqCst);
        info!(last_tick, %reason, "Ticker stopped");
        inner.dispatcher.dispatch(TickerStoppedEvent::new(last_tick, reason));
    }

    /// Iterate until a stop request, a veto or an unresumed interruption
    fn tick_until_exit(&self) -> StopReason {
        let inner = &self.inner;
        let mut pacer = Pacer::new(inner.config.period());
        let mut tick = 0;
        loop {
            if inner.state.load() == TickerState::Stopping {
                return StopReason::Requested;
            }
            let started = Instant::now();
            inner.tick.store(tick, Ordering::SeqCst);

            match self.run_iteration(tick) {
                Ok(true) => {}
                Ok(false) => return StopReason::Vetoed,
                Err(fault) => {
                    warn!(tick, error = %fault, "Tick interrupted");
                    let event = TickInterruptedEvent::new(tick, fault);
                    if !inner.dispatcher.dispatch(event).unwrap_or(false) {
                        return StopReason::Interrupted;
                    }
                }
            }

            tick = next_tick(tick);
            let wait = pacer.next_wait(started.elapsed());
            if wait.is_zero() {
                debug!(tick, carried = ?pacer.carried_overrun(), "Ticker::run_loop: behind schedule");
            } else {
                thread::sleep(wait);
            }
        }
    }

    /// Run due tasks, then dispatch the tick; `Ok(false)` means a listener vetoed
    fn run_iteration(&self, tick: i64) -> Result<bool, TickFault> {
        let tasks = self.inner.tasks.read().clone();
        for task in &tasks {
            task.tick(tick)?;
        }
        Ok(self.inner.dispatcher.dispatch(TickEvent::new(tick)).unwrap_or(true))
    }
}

/// Marks the loop thread for its lifetime and returns the ticker to idle on exit
struct LoopGuard<'a> {
    inner: &'a TickerInner,
}

impl<'a> LoopGuard<'a> {
    fn enter(inner: &'a TickerInner) -> Self {
        *inner.loop_thread.lock() = Some(thread::current().id());
        Self { inner }
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        *self.inner.loop_thread.lock() = None;
        self.inner.state.store(TickerState::Idle);
    }
}
