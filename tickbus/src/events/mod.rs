//! Events module - typed event registry and dispatcher
//!
//! Listeners are registered per event kind (a Rust type) and receive every
//! dispatched event of that kind or of any kind that embeds it as a parent.
//! Dispatch is synchronous on the caller's thread, or asynchronous on the
//! worker pool with the final result handed to a callback.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(WorkerPool::with_defaults());
//! let id = dispatcher.register(|tick: &mut TickEvent| {
//!     if tick.tick() >= 5 {
//!         tick.result_mut().set(false);
//!     }
//! });
//! dispatcher.unregister::<TickEvent>(id);
//! ```

mod dispatcher;
mod error;
mod event;
mod listener;
mod registry;
mod sink;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use event::{Event, EventBase, ResultSlot, Upcast};
pub use listener::{ListenerId, ListenerOutcome, ListenerSet, Subscriber};
pub use sink::{DispatchFailure, ErrorSink, TracingSink};
