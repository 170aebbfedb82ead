//! Listener registry and subscription handles.
//!
//! Maps event names to ordered listeners. Every subscriber gets its own
//! buffered channel; events are fanned out in translation order from the
//! single session task, so per-name ordering (in fact, global ordering) is
//! preserved without extra synchronization. Invalidation clears the whole
//! registry in one call, after which no previously registered listener can
//! receive anything.

use std::collections::HashMap;
use tapbridge_core::{BridgeEvent, EventName};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events buffered per subscriber before the bridge starts dropping for that
/// listener.
const SUBSCRIBER_BUFFER: usize = 256;

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registered listener's receiving end.
///
/// Dropping the subscription unregisters the listener lazily; the registry
/// prunes closed listeners on the next publish to their event name.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    name: EventName,
    rx: mpsc::Receiver<BridgeEvent>,
}

impl Subscription {
    /// Identifier for explicit `unsubscribe` calls.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The event name this subscription listens to.
    #[must_use]
    pub fn event_name(&self) -> EventName {
        self.name
    }

    /// Receive the next event, in emission order.
    ///
    /// Returns `None` once the bridge unregisters this listener (unsubscribe
    /// or invalidation) and all buffered events are drained.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for draining in tests and teardown paths.
    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        self.rx.try_recv().ok()
    }
}

/// Ordered listeners per event name.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<EventName, Vec<(SubscriptionId, mpsc::Sender<BridgeEvent>)>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `name` and hand back its subscription.
    pub fn subscribe(&mut self, name: EventName) -> Subscription {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.listeners.entry(name).or_default().push((id, tx));
        debug!(event = %name, ?id, "listener registered");
        Subscription { id, name, rx }
    }

    /// Unregister a listener. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.listeners.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|(sub_id, _)| *sub_id != id);
            removed |= subs.len() != before;
            !subs.is_empty()
        });
        if removed {
            debug!(?id, "listener unregistered");
        }
        removed
    }

    /// Deliver an event to every listener of its name, in registration order.
    ///
    /// Listeners whose receiving end is gone are pruned. A listener that has
    /// fallen `SUBSCRIBER_BUFFER` events behind has the event dropped for it,
    /// with a warning; the session must never block on a slow consumer.
    pub fn publish(&mut self, event: &BridgeEvent) {
        let name = event.name();
        let Some(subs) = self.listeners.get_mut(&name) else {
            return;
        };
        subs.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = %name, ?id, "listener too slow, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if subs.is_empty() {
            self.listeners.remove(&name);
        }
    }

    /// Number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.get(&name).map_or(0, Vec::len)
    }

    /// Total listeners across all event names.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Drop every listener at once (bridge invalidation).
    ///
    /// Subscribers observe the end of their stream after draining whatever
    /// was already delivered.
    pub fn clear(&mut self) {
        let dropped = self.total_listeners();
        self.listeners.clear();
        debug!(dropped, "listener registry cleared");
    }
}
