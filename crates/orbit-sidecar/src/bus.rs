use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use orbit_core::events::{BridgeEvent, EventKind};

pub type EventHandler = Arc<dyn Fn(&BridgeEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct Subscriber {
    token: SubscriptionToken,
    kind: EventKind,
    handler: EventHandler,
}

/// In-process publish/subscribe bus for view lifecycle, selection and menu events.
///
/// Delivery is synchronous, on the publishing thread, in subscription order.
/// There is no replay: late subscribers never see earlier events.
#[derive(Default)]
pub struct EventBus {
    next_token: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind. Registering the same closure twice
    /// yields two independent deliveries.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(&BridgeEvent) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber {
            token,
            kind,
            handler: Arc::new(handler),
        });
        debug!(event = kind.name(), token = token.0, "subscribed");
        token
    }

    /// Remove a handler. Unknown or already-removed tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.token != token);
        let removed = subscribers.len() != before;
        if removed {
            debug!(token = token.0, "unsubscribed");
        }
        removed
    }

    /// Deliver `event` to every current subscriber of its kind. Returns the delivery count.
    pub fn publish(&self, event: &BridgeEvent) -> usize {
        let kind = event.kind();
        // Handlers run without the lock held so they can publish or (un)subscribe.
        let handlers: Vec<EventHandler> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        trace!(
            event = kind.name(),
            view_id = %event.view_id,
            receivers = handlers.len(),
            "publish"
        );
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }
}
