//! Tickbus - typed in-process event bus with a fixed-rate ticker
//!
//! Three pieces sharing one worker pool:
//!
//! - [`events`] - listener registry and dispatcher; listeners are keyed by
//!   event type and also receive events that embed their type as a parent
//! - [`ticker`] - fixed-rate loop (30 Hz by default) that emits tick events and
//!   fires periodic tasks, paying back overrun from slow iterations
//! - [`pool`] - bounded thread pool hosting async dispatches and the ticker
//!
//! [`Runtime`] wires the three together from a [`Config`].
//!
//! # Example
//!
//! ```rust,no_run
//! use tickbus::{Config, Runtime};
//! use tickbus::ticker::{Period, TickEvent};
//!
//! let runtime = Runtime::new(&Config::default());
//! runtime.dispatcher().register(|tick: &mut TickEvent| {
//!     if tick.tick() >= 90 {
//!         tick.veto();
//!     }
//! });
//! runtime
//!     .ticker()
//!     .schedule(Period::seconds(1), |tick| println!("tick {tick}"))
//!     .unwrap();
//! runtime.ticker().start().unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod events;
pub mod pool;
pub mod runtime;
pub mod ticker;

pub use config::Config;
pub use events::{Dispatcher, Event, EventBase, ListenerId, ListenerSet, ResultSlot, Subscriber};
pub use pool::{PoolConfig, PoolError, TaskHandle, WorkerPool};
pub use runtime::Runtime;
pub use ticker::{Period, TickEvent, Ticker, TickerConfig, TickerError, TimeUnit};
