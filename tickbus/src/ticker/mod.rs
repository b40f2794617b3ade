//! Ticker module - fixed-rate loop with periodic tasks
//!
//! The loop runs on a worker pool thread at a nominal rate (30 Hz by default).
//! Each iteration fires the periodic tasks whose period divides the tick
//! count, dispatches a [`TickEvent`], then sleeps for what is left of the
//! period after paying back any earlier overrun.
//!
//! Listeners steer the loop through event results: `false` on a
//! [`TickEvent`] ends it, `true` on a [`TickInterruptedEvent`] keeps it
//! going after a failing task.

mod config;
mod core;
mod error;
mod events;
mod pacing;
mod state;
mod task;

pub use config::TickerConfig;
pub use self::core::Ticker;
pub use error::{TickFault, TickerError};
pub use events::{StopReason, TickEvent, TickInterruptedEvent, TickerStoppedEvent};
pub use pacing::{Pacer, next_tick};
pub use state::TickerState;
pub use task::{Period, TaskId, TimeUnit};
