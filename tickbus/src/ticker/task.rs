//! Periodic tasks attached to the ticker

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::ListenerOutcome;
use crate::pool::panic_message;

use super::error::{TickFault, TickerError};

/// Unit of a [`Period`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    fn millis_per_unit(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
        }
    }
}

/// A task cadence expressed as (count, unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub count: u64,
    pub unit: TimeUnit,
}

impl Period {
    pub fn new(count: u64, unit: TimeUnit) -> Self {
        Self { count, unit }
    }

    pub fn millis(count: u64) -> Self {
        Self::new(count, TimeUnit::Milliseconds)
    }

    pub fn seconds(count: u64) -> Self {
        Self::new(count, TimeUnit::Seconds)
    }

    /// Length in milliseconds, saturating
    pub fn to_millis(&self) -> u64 {
        self.count.saturating_mul(self.unit.millis_per_unit())
    }
}

impl From<Duration> for Period {
    /// Truncates to whole milliseconds
    fn from(duration: Duration) -> Self {
        Self::millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

/// Handle for a scheduled task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

type TaskFn = dyn Fn(i64) -> eyre::Result<()> + Send + Sync;

/// A callable fired on ticks aligned with its period
pub(crate) struct PeriodicTask {
    id: TaskId,
    period: Period,
    period_ms: u64,
    run: Box<TaskFn>,
}

impl PeriodicTask {
    pub fn new<F, O>(id: TaskId, period: Period, run: F) -> Result<Self, TickerError>
    where
        F: Fn(i64) -> O + Send + Sync + 'static,
        O: ListenerOutcome,
    {
        let period_ms = period.to_millis();
        if period_ms == 0 {
            return Err(TickerError::ZeroPeriod);
        }
        Ok(Self {
            id,
            period,
            period_ms,
            run: Box::new(move |tick| run(tick).into_result()),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Due on every tick that is a multiple of the period in milliseconds
    pub fn is_due(&self, tick: i64) -> bool {
        u64::try_from(tick).is_ok_and(|t| t % self.period_ms == 0)
    }

    /// Run the task if it is due; returns whether it fired
    pub fn tick(&self, tick: i64) -> Result<bool, TickFault> {
        if !self.is_due(tick) {
            return Ok(false);
        }
        debug!(task = %self.id, tick, "PeriodicTask::tick: firing");
        match panic::catch_unwind(AssertUnwindSafe(|| (self.run)(tick))) {
            Ok(Ok(())) => Ok(true),
            Ok(Err(report)) => Err(TickFault::TaskFailed { task: self.id, report }),
            Err(payload) => Err(TickFault::TaskPanicked {
                task: self.id,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("id", &self.id)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}
