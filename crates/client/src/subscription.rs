//! Synchronous listener registry (observer plumbing for the identity store).
//!
//! - No IO / no async
//! - Listeners run on the publishing thread, in registration order
//! - Listeners are invoked outside the registry lock, so a listener may read
//!   the store or register/drop other subscriptions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

pub type Listener<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct Entry<M> {
    id: u64,
    listener: Listener<M>,
}

pub struct ListenerRegistry<M> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<M>>>,
}

impl<M> Default for ListenerRegistry<M> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<M: 'static> core::fmt::Debug for ListenerRegistry<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<M: 'static> ListenerRegistry<M> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `listener`; it stays registered until the returned handle is
    /// dropped or [`Subscription::unsubscribe`]d.
    pub fn subscribe(self: &Arc<Self>, listener: impl Fn(&M) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // A poisoned registry still hands out a handle; it just never fires.
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Entry {
                id,
                listener: Arc::new(listener),
            });
        }

        let registry: Weak<Self> = Arc::downgrade(self);
        Subscription {
            id,
            registry: Some(registry as Weak<dyn Unregister>),
        }
    }

    /// Invoke every registered listener with `message`.
    pub fn notify(&self, message: &M) {
        let snapshot: Vec<Listener<M>> = match self.entries.lock() {
            Ok(entries) => entries.iter().map(|e| Arc::clone(&e.listener)).collect(),
            Err(_) => return,
        };

        for listener in snapshot {
            listener(message);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

impl<M: 'static> Unregister for ListenerRegistry<M> {
    fn unregister(&self, id: u64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|e| e.id != id);
        }
    }
}

/// Handle to a registered listener. Dropping it deregisters the listener.
#[must_use = "dropping a Subscription immediately deregisters its listener"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Unregister>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for the registry's whole lifetime.
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(&u32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |m: &u32| sink.lock().unwrap().push(*m))
    }

    #[test]
    fn listeners_receive_messages_until_unsubscribed() {
        let registry = ListenerRegistry::<u32>::new();
        let (seen, listener) = recorder();

        let subscription = registry.subscribe(listener);
        registry.notify(&1);
        registry.notify(&2);
        subscription.unsubscribe();
        registry.notify(&3);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert!(registry.is_empty());
    }

    #[test]
    fn dropping_the_handle_deregisters() {
        let registry = ListenerRegistry::<u32>::new();
        let (seen, listener) = recorder();

        {
            let _subscription = registry.subscribe(listener);
            registry.notify(&7);
        }
        registry.notify(&8);

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn detached_listener_stays_registered() {
        let registry = ListenerRegistry::<u32>::new();
        let (seen, listener) = recorder();

        registry.subscribe(listener).detach();
        registry.notify(&5);

        assert_eq!(*seen.lock().unwrap(), vec![5]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listener_may_subscribe_during_notification() {
        let registry = ListenerRegistry::<u32>::new();
        let inner = Arc::clone(&registry);

        registry
            .subscribe(move |_| inner.subscribe(|_| {}).detach())
            .detach();
        registry.notify(&0);

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn debug_reports_listener_count() {
        let registry = ListenerRegistry::<u32>::new();
        let subscription = registry.subscribe(|_| {});

        assert_eq!(format!("{registry:?}"), "ListenerRegistry { listeners: 1 }");
        assert_eq!(
            format!("{subscription:?}"),
            "Subscription { id: 0, attached: true }"
        );
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let registry = ListenerRegistry::<u32>::new();
        let subscription = registry.subscribe(|_| {});
        drop(registry);
        drop(subscription);
    }
}
