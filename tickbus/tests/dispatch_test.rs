//! Integration tests for event dispatch
//!
//! Subtype delivery, result propagation and failure isolation through the
//! public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use proptest::prelude::*;
use tickbus::events::{DispatchFailure, Dispatcher, Event, EventBase, ListenerId, ResultSlot, Upcast};
use tickbus::pool::WorkerPool;

// =============================================================================
// Test events
// =============================================================================

struct SomeEvent {
    base: EventBase<i64>,
    log: Vec<usize>,
}

impl SomeEvent {
    fn new() -> Self {
        Self {
            base: EventBase::with_result("some-event", 0),
            log: Vec::new(),
        }
    }
}

impl Event for SomeEvent {
    type Output = i64;

    fn name(&self) -> &str {
        self.base.name()
    }

    fn result(&self) -> &ResultSlot<i64> {
        self.base.result()
    }

    fn result_mut(&mut self) -> &mut ResultSlot<i64> {
        self.base.result_mut()
    }
}

struct SomeChildEvent {
    parent: SomeEvent,
}

impl SomeChildEvent {
    fn new() -> Self {
        Self {
            parent: SomeEvent::new(),
        }
    }
}

impl Event for SomeChildEvent {
    type Output = i64;

    fn name(&self) -> &str {
        self.parent.name()
    }

    fn result(&self) -> &ResultSlot<i64> {
        self.parent.result()
    }

    fn result_mut(&mut self) -> &mut ResultSlot<i64> {
        self.parent.result_mut()
    }

    fn parent_mut(&mut self) -> Option<&mut dyn Upcast> {
        Some(&mut self.parent)
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(WorkerPool::with_defaults())
}

fn collecting_dispatcher() -> (Dispatcher, Arc<Mutex<Vec<ListenerId>>>) {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&failures);
    let dispatcher = Dispatcher::with_sink(WorkerPool::with_defaults(), move |f: &DispatchFailure| {
        seen.lock().push(f.listener);
    });
    (dispatcher, failures)
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn test_child_event_reaches_parent_and_child_listeners() {
    let dispatcher = dispatcher();
    let parent_hits = Arc::new(AtomicUsize::new(0));
    let child_hits = Arc::new(AtomicUsize::new(0));

    let p = Arc::clone(&parent_hits);
    dispatcher.register(move |_: &mut SomeEvent| {
        p.fetch_add(1, Ordering::SeqCst);
    });
    let c = Arc::clone(&child_hits);
    dispatcher.register(move |_: &mut SomeChildEvent| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher.dispatch(SomeChildEvent::new());
    assert_eq!(parent_hits.load(Ordering::SeqCst), 1);
    assert_eq!(child_hits.load(Ordering::SeqCst), 1);

    // A plain parent event never reaches the child bucket
    dispatcher.dispatch(SomeEvent::new());
    assert_eq!(parent_hits.load(Ordering::SeqCst), 2);
    assert_eq!(child_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_result_propagates_through_listeners_in_order() {
    let dispatcher = dispatcher();
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().update(|v| v.map(|x| x + 1)));
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().update(|v| v.map(|x| x * 3)));
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().update(|v| v.map(|x| x + 2)));

    assert_eq!(dispatcher.dispatch(SomeEvent::new()), Some(5));
    // Pure listeners give the same answer every time
    assert_eq!(dispatcher.dispatch(SomeEvent::new()), Some(5));
}

#[test]
fn test_child_result_is_shared_with_parent_view() {
    let dispatcher = dispatcher();
    dispatcher.register(|e: &mut SomeChildEvent| e.result_mut().set(10));
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().update(|v| v.map(|x| x * 2)));

    assert_eq!(dispatcher.dispatch(SomeChildEvent::new()), Some(20));
}

#[test]
fn test_failing_listener_does_not_stop_later_ones() {
    let (dispatcher, failures) = collecting_dispatcher();
    let thrower = dispatcher.register(|_: &mut SomeEvent| -> () { panic!("L1 throws") });
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().set(42));

    assert_eq!(dispatcher.dispatch(SomeEvent::new()), Some(42));
    assert_eq!(*failures.lock(), vec![thrower]);
}

#[test]
fn test_unregistered_listener_is_not_invoked() {
    let dispatcher = dispatcher();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let id = dispatcher.register(move |_: &mut SomeEvent| {
        h.fetch_add(1, Ordering::SeqCst);
    });

    assert!(dispatcher.unregister::<SomeEvent>(id));
    dispatcher.dispatch(SomeChildEvent::new());
    dispatcher.dispatch(SomeEvent::new());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // Wrong kind or unknown bucket is a no-op
    assert!(!dispatcher.unregister::<SomeChildEvent>(id));
}

#[test]
fn test_boundaries() {
    let dispatcher = dispatcher();
    assert_eq!(dispatcher.dispatch_opt::<SomeEvent>(None), None);
    assert_eq!(dispatcher.dispatch(SomeChildEvent::new()), Some(0));
    assert_eq!(dispatcher.bucket_count(), 0);
}

#[test]
fn test_concurrent_register_dispatch_unregister() {
    let dispatcher = dispatcher();
    let total = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let id = dispatcher.register(|e: &mut SomeEvent| e.result_mut().update(|v| v.map(|x| x + 1)));
                    // At least our own listener is registered
                    let seen = dispatcher.dispatch(SomeChildEvent::new()).unwrap_or(0);
                    assert!(seen >= 1);
                    total.fetch_add(1, Ordering::SeqCst);
                    assert!(dispatcher.unregister::<SomeEvent>(id));
                }
            });
        }
    });

    assert_eq!(total.load(Ordering::SeqCst), 800);
    assert_eq!(dispatcher.listener_count::<SomeEvent>(), 0);
    assert_eq!(dispatcher.dispatch(SomeEvent::new()), Some(0));
}

#[tokio::test]
async fn test_awaiting_async_dispatch() {
    let dispatcher = dispatcher();
    dispatcher.register(|e: &mut SomeEvent| e.result_mut().set(8));
    let handle = dispatcher.dispatch_with_handle(SomeEvent::new()).unwrap();
    assert_eq!(handle.await.unwrap(), Some(8));
}

// =============================================================================
// Properties
// =============================================================================

/// Expected delivery order: buckets by first registration, registration order within
fn expected_order(kinds: &[bool], child_event: bool) -> Vec<usize> {
    let mut bucket_order = Vec::new();
    for &kind in kinds {
        if !bucket_order.contains(&kind) {
            bucket_order.push(kind);
        }
    }
    bucket_order
        .into_iter()
        .filter(|&is_child| child_event || !is_child)
        .flat_map(move |bucket| {
            kinds
                .iter()
                .enumerate()
                .filter(move |(_, k)| **k == bucket)
                .map(|(i, _)| i)
        })
        .collect()
}

fn register_logging(dispatcher: &Dispatcher, kinds: &[bool]) -> Vec<ListenerId> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, &is_child)| {
            if is_child {
                dispatcher.register(move |e: &mut SomeChildEvent| e.parent.log.push(i))
            } else {
                dispatcher.register(move |e: &mut SomeEvent| e.log.push(i))
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_every_matching_listener_runs_once_in_order(kinds in prop::collection::vec(any::<bool>(), 0..24)) {
        let dispatcher = dispatcher();
        register_logging(&dispatcher, &kinds);

        let mut child = SomeChildEvent::new();
        dispatcher.dispatch_mut(&mut child);
        prop_assert_eq!(child.parent.log, expected_order(&kinds, true));

        let mut parent = SomeEvent::new();
        dispatcher.dispatch_mut(&mut parent);
        prop_assert_eq!(parent.log, expected_order(&kinds, false));
    }

    #[test]
    fn prop_unregistered_listeners_never_run(
        kinds in prop::collection::vec(any::<bool>(), 1..16),
        drop_mask in prop::collection::vec(any::<bool>(), 16),
    ) {
        let dispatcher = dispatcher();
        let ids = register_logging(&dispatcher, &kinds);

        let mut kept = Vec::new();
        for (i, id) in ids.into_iter().enumerate() {
            if drop_mask[i] {
                let removed = if kinds[i] {
                    dispatcher.unregister::<SomeChildEvent>(id)
                } else {
                    dispatcher.unregister::<SomeEvent>(id)
                };
                prop_assert!(removed);
            } else {
                kept.push(i);
            }
        }

        let mut child = SomeChildEvent::new();
        dispatcher.dispatch_mut(&mut child);
        let mut delivered = child.parent.log.clone();
        delivered.sort_unstable();
        prop_assert_eq!(delivered, kept);
    }
}
