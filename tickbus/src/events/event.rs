//! Event trait, result slot, and parent-chain views
//!
//! An event kind is a Rust type. "Is-a" relationships are explicit: a child
//! event embeds its parent and exposes it through [`Event::parent_mut`], and
//! shares the parent's result slot. A listener registered for the parent kind
//! then receives the child through the parent view.

use std::any::{Any, TypeId};
use std::borrow::Cow;

/// Mutable result carried by an event through a dispatch
///
/// Starts unset unless the event's constructor seeds a default. Listeners
/// read and overwrite it; whatever it holds after the last listener is what
/// the producer gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSlot<R> {
    value: Option<R>,
}

impl<R> Default for ResultSlot<R> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<R> ResultSlot<R> {
    /// An unset slot
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot seeded with a default value
    pub fn with(value: R) -> Self {
        Self { value: Some(value) }
    }

    pub fn get(&self) -> Option<&R> {
        self.value.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.value.as_mut()
    }

    pub fn set(&mut self, value: R) {
        self.value = Some(value);
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn take(&mut self) -> Option<R> {
        self.value.take()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Replace the value with one computed from the current value
    pub fn update(&mut self, f: impl FnOnce(Option<R>) -> Option<R>) {
        self.value = f(self.value.take());
    }
}

/// Name and result slot shared by most event types
///
/// Embed one in a root event and delegate [`Event::name`], [`Event::result`]
/// and [`Event::result_mut`] to it.
#[derive(Debug, Clone)]
pub struct EventBase<R> {
    name: Cow<'static, str>,
    result: ResultSlot<R>,
}

impl<R> EventBase<R> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            result: ResultSlot::empty(),
        }
    }

    /// Create with the result slot pre-seeded
    pub fn with_result(name: impl Into<Cow<'static, str>>, result: R) -> Self {
        Self {
            name: name.into(),
            result: ResultSlot::with(result),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> &ResultSlot<R> {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut ResultSlot<R> {
        &mut self.result
    }
}

/// A value that can be dispatched to listeners
///
/// Routing is by the implementing type, never by [`Event::name`], which exists
/// for diagnostics only.
pub trait Event: Any + Send {
    /// Type of the value listeners may leave in the result slot
    type Output: Send + 'static;

    /// Human-readable name for logs and failure reports
    fn name(&self) -> &str;

    fn result(&self) -> &ResultSlot<Self::Output>;

    fn result_mut(&mut self) -> &mut ResultSlot<Self::Output>;

    /// The embedded parent event, for kinds that refine another kind
    fn parent_mut(&mut self) -> Option<&mut dyn Upcast> {
        None
    }
}

/// Type-erased walk from an event to any of its ancestor kinds
///
/// Implemented for every [`Event`]; not meant to be implemented by hand.
pub trait Upcast: Any + Send {
    /// View of this event as `kind`, if `kind` is this event's own type or an ancestor
    fn view_mut(&mut self, kind: TypeId) -> Option<&mut dyn Any>;

    /// Type name of the concrete event, for diagnostics
    fn kind_name(&self) -> &'static str;
}

impl<E: Event> Upcast for E {
    fn view_mut(&mut self, kind: TypeId) -> Option<&mut dyn Any> {
        if TypeId::of::<E>() == kind {
            return Some(self as &mut dyn Any);
        }
        self.parent_mut()?.view_mut(kind)
    }

    fn kind_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}
