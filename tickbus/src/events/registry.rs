//! Listener registry - ordered buckets keyed by event kind

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::event::Upcast;
use super::listener::{ErasedListener, ListenerId, PendingListener};

/// One registered listener inside a bucket
#[derive(Clone)]
struct Registered {
    id: ListenerId,
    listener: Arc<ErasedListener>,
}

/// Listeners for a single event kind, in registration order
struct Bucket {
    kind: TypeId,
    kind_name: &'static str,
    listeners: Vec<Registered>,
}

/// A listener selected for one dispatch
pub(crate) struct Delivery {
    pub kind: TypeId,
    pub kind_name: &'static str,
    pub id: ListenerId,
    pub listener: Arc<ErasedListener>,
}

/// Buckets in creation order
///
/// Buckets are created on first registration for a kind and are never
/// removed, only emptied.
#[derive(Default)]
pub(crate) struct Registry {
    buckets: Vec<Bucket>,
    index: HashMap<TypeId, usize>,
}

impl Registry {
    pub fn insert(&mut self, id: ListenerId, pending: PendingListener) {
        let slot = match self.index.get(&pending.kind) {
            Some(&slot) => slot,
            None => {
                debug!(kind = pending.kind_name, "Registry::insert: creating bucket");
                self.buckets.push(Bucket {
                    kind: pending.kind,
                    kind_name: pending.kind_name,
                    listeners: Vec::new(),
                });
                let slot = self.buckets.len() - 1;
                self.index.insert(pending.kind, slot);
                slot
            }
        };
        self.buckets[slot].listeners.push(Registered {
            id,
            listener: pending.listener,
        });
    }

    /// Remove a listener; false if the bucket or listener is absent
    pub fn remove(&mut self, kind: TypeId, id: ListenerId) -> bool {
        let Some(&slot) = self.index.get(&kind) else {
            return false;
        };
        let listeners = &mut self.buckets[slot].listeners;
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        before != listeners.len()
    }

    pub fn listener_count(&self, kind: TypeId) -> usize {
        self.index
            .get(&kind)
            .map(|&slot| self.buckets[slot].listeners.len())
            .unwrap_or(0)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Snapshot every listener whose kind the event can be viewed as
    ///
    /// Bucket creation order across kinds, registration order within a kind.
    pub fn matching(&self, event: &mut dyn Upcast) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        for bucket in &self.buckets {
            if bucket.listeners.is_empty() || event.view_mut(bucket.kind).is_none() {
                continue;
            }
            deliveries.extend(bucket.listeners.iter().map(|r| Delivery {
                kind: bucket.kind,
                kind_name: bucket.kind_name,
                id: r.id,
                listener: Arc::clone(&r.listener),
            }));
        }
        deliveries
    }
}
