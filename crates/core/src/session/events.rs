//! Auth event fan-out
//!
//! [`AuthEventHub`] delivers every published [`AuthEvent`] to each live
//! subscriber, in publish order, through its own unbounded queue. A
//! subscription stays registered until its [`SubscriptionGuard`] is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use accountsync_domain::AuthEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<AuthEvent>)>>,
}

impl Registry {
    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Publisher side shared by session oracle adapters.
#[derive(Clone, Default)]
pub struct AuthEventHub {
    registry: Arc<Registry>,
}

impl AuthEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> AuthSubscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.subscribers.lock().push((id, tx));
        debug!(subscription_id = id, "auth subscription registered");

        AuthSubscription {
            events: rx,
            guard: SubscriptionGuard { id, registry: Arc::downgrade(&self.registry) },
        }
    }

    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// is gone are pruned.
    pub fn publish(&self, event: AuthEvent) {
        let mut subscribers = self.registry.subscribers.lock();
        debug!(event = event.name(), subscribers = subscribers.len(), "publishing auth event");
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }
}

impl std::fmt::Debug for AuthEventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEventHub").field("subscribers", &self.subscriber_count()).finish()
    }
}

/// Ordered stream of auth events for one subscriber.
#[derive(Debug)]
pub struct AuthSubscription {
    events: mpsc::UnboundedReceiver<AuthEvent>,
    guard: SubscriptionGuard,
}

impl AuthSubscription {
    /// Next event, or `None` once the subscription has been released.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }

    /// Next already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.events.try_recv().ok()
    }

    /// Release the subscription now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Separate the event stream from its disposer so the two can live in
    /// different owners. Dropping the guard closes the stream.
    pub fn split(self) -> (mpsc::UnboundedReceiver<AuthEvent>, SubscriptionGuard) {
        (self.events, self.guard)
    }
}

/// Disposer for a subscription. Unregisters on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    id: u64,
    registry: Weak<Registry>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
            debug!(subscription_id = self.id, "auth subscription released");
        }
    }
}
