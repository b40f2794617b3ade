//! Events emitted by the ticker loop

use std::fmt;

use serde::Serialize;

use crate::events::{Event, EventBase, ResultSlot};

use super::error::TickFault;

/// Dispatched once per iteration
///
/// The result defaults to `true`; a listener leaving `false` ends the loop.
#[derive(Debug)]
pub struct TickEvent {
    base: EventBase<bool>,
    tick: i64,
}

impl TickEvent {
    pub fn new(tick: i64) -> Self {
        Self {
            base: EventBase::with_result("tick", true),
            tick,
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    /// Ask the loop to stop after this iteration
    pub fn veto(&mut self) {
        self.base.result_mut().set(false);
    }
}

impl Event for TickEvent {
    type Output = bool;

    fn name(&self) -> &str {
        self.base.name()
    }

    fn result(&self) -> &ResultSlot<bool> {
        self.base.result()
    }

    fn result_mut(&mut self) -> &mut ResultSlot<bool> {
        self.base.result_mut()
    }
}

/// Dispatched when a tick iteration fails
///
/// The result defaults to `false` (stop); a listener setting `true` keeps the
/// loop going.
#[derive(Debug)]
pub struct TickInterruptedEvent {
    base: EventBase<bool>,
    last_tick: i64,
    cause: TickFault,
}

impl TickInterruptedEvent {
    pub fn new(last_tick: i64, cause: TickFault) -> Self {
        Self {
            base: EventBase::with_result("tick-interrupted", false),
            last_tick,
            cause,
        }
    }

    pub fn last_tick(&self) -> i64 {
        self.last_tick
    }

    pub fn cause(&self) -> &TickFault {
        &self.cause
    }

    /// Keep ticking despite the failure
    pub fn resume(&mut self) {
        self.base.result_mut().set(true);
    }
}

impl Event for TickInterruptedEvent {
    type Output = bool;

    fn name(&self) -> &str {
        self.base.name()
    }

    fn result(&self) -> &ResultSlot<bool> {
        self.base.result()
    }

    fn result_mut(&mut self) -> &mut ResultSlot<bool> {
        self.base.result_mut()
    }
}

/// Why the loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// `Ticker::stop` was called
    Requested,
    /// A `TickEvent` listener left `false`
    Vetoed,
    /// An iteration failed and no listener resumed
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Requested => "requested",
            StopReason::Vetoed => "vetoed",
            StopReason::Interrupted => "interrupted",
        };
        write!(f, "{}", s)
    }
}

/// Dispatched exactly once each time the loop exits
#[derive(Debug)]
pub struct TickerStoppedEvent {
    base: EventBase<()>,
    last_tick: i64,
    reason: StopReason,
}

impl TickerStoppedEvent {
    pub fn new(last_tick: i64, reason: StopReason) -> Self {
        Self {
            base: EventBase::new("ticker-stopped"),
            last_tick,
            reason,
        }
    }

    pub fn last_tick(&self) -> i64 {
        self.last_tick
    }

    pub fn reason(&self) -> StopReason {
        self.reason
    }
}

impl Event for TickerStoppedEvent {
    type Output = ();

    fn name(&self) -> &str {
        self.base.name()
    }

    fn result(&self) -> &ResultSlot<()> {
        self.base.result()
    }

    fn result_mut(&mut self) -> &mut ResultSlot<()> {
        self.base.result_mut()
    }
}
