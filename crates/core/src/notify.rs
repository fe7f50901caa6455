//! Synchronous change notification.
//!
//! An [`Emitter`] keeps a registry of listeners and invokes them in-line on
//! [`Emitter::fire`]. Every registration hands back a [`Subscription`] that removes
//! the listener when dropped, so an owner releases its listeners on its own teardown
//! path without any explicit bookkeeping.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: BTreeMap<u64, Listener<T>>,
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: 'static> Unsubscribe for Mutex<Registry<T>> {
    fn remove(&self, id: u64) {
        lock(self).listeners.remove(&id);
    }
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Emitter<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        let registry = Registry { next_id: 0, listeners: BTreeMap::new() };
        Self { registry: Arc::new(Mutex::new(registry)) }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        drop(registry);

        let handle: Arc<dyn Unsubscribe> = self.registry.clone();
        Subscription { registry: Some(Arc::downgrade(&handle)), id }
    }

    /// Delivers `event` to the listeners registered at the time of the call.
    ///
    /// The registry lock is released before any listener runs, so listeners may
    /// subscribe or unsubscribe while being notified.
    pub fn fire(&self, event: &T) {
        let listeners: Vec<Listener<T>> =
            lock(&self.registry).listeners.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    registry: Option<Weak<dyn Unsubscribe>>,
    id: u64,
}

impl Subscription {
    pub fn dispose(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.registry.as_ref().is_some_and(|registry| registry.strong_count() > 0)
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|registry| registry.upgrade()) {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Owns a group of subscriptions that share one teardown path.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn dispose(&mut self) {
        self.subscriptions.drain(..).for_each(Subscription::dispose);
    }
}
