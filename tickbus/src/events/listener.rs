//! Listener handles, outcomes, and bulk registration

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use eyre::eyre;

use super::event::Event;

/// Opaque handle identifying one registration
///
/// Returned by `register`; pass it back to `unregister`. Two registrations of
/// the same closure get distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// What a listener (or periodic task) may return
///
/// Plain closures return `()`. Closures that can fail return
/// `eyre::Result<()>`; an `Err` is reported like a panic would be.
pub trait ListenerOutcome {
    fn into_result(self) -> eyre::Result<()>;
}

impl ListenerOutcome for () {
    fn into_result(self) -> eyre::Result<()> {
        Ok(())
    }
}

impl ListenerOutcome for eyre::Result<()> {
    fn into_result(self) -> eyre::Result<()> {
        self
    }
}

pub(crate) type ErasedListener = dyn Fn(&mut dyn Any) -> eyre::Result<()> + Send + Sync;

/// Wrap a typed listener so the registry can store it next to other kinds
pub(crate) fn erase<E, F, O>(listener: F) -> Arc<ErasedListener>
where
    E: Event,
    F: Fn(&mut E) -> O + Send + Sync + 'static,
    O: ListenerOutcome,
{
    Arc::new(move |view: &mut dyn Any| match view.downcast_mut::<E>() {
        Some(event) => listener(event).into_result(),
        None => Err(eyre!("listener for {} handed a foreign event view", type_name::<E>())),
    })
}

/// A listener waiting to be registered
pub(crate) struct PendingListener {
    pub kind: TypeId,
    pub kind_name: &'static str,
    pub listener: Arc<ErasedListener>,
}

/// A batch of typed listeners registered together
///
/// Each entry becomes one bucket registration, in the order it was added.
///
/// ```rust,ignore
/// let set = ListenerSet::new()
///     .on(|tick: &mut TickEvent| println!("tick {}", tick.tick()))
///     .on(|_: &mut TickerStoppedEvent| println!("stopped"));
/// let ids = dispatcher.register_all(set);
/// ```
#[derive(Default)]
pub struct ListenerSet {
    entries: Vec<PendingListener>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for event kind `E` (builder style)
    pub fn on<E, F, O>(mut self, listener: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) -> O + Send + Sync + 'static,
        O: ListenerOutcome,
    {
        self.add(listener);
        self
    }

    /// Add a listener for event kind `E`
    pub fn add<E, F, O>(&mut self, listener: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E) -> O + Send + Sync + 'static,
        O: ListenerOutcome,
    {
        self.entries.push(PendingListener {
            kind: TypeId::of::<E>(),
            kind_name: type_name::<E>(),
            listener: erase(listener),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<PendingListener> {
        self.entries
    }
}

/// A shared object whose methods act as listeners
///
/// Implementors hand out closures bound to their own `Arc`, one per handled
/// event kind.
///
/// ```rust,ignore
/// struct Stats { ticks: AtomicU64 }
///
/// impl Subscriber for Stats {
///     fn listeners(self: Arc<Self>) -> ListenerSet {
///         ListenerSet::new().on(move |_: &mut TickEvent| {
///             self.ticks.fetch_add(1, Ordering::Relaxed);
///         })
///     }
/// }
/// ```
pub trait Subscriber: Send + Sync + 'static {
    fn listeners(self: Arc<Self>) -> ListenerSet;
}
