//! Per-channel listener bookkeeping shared by transport implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

use super::{Listener, ListenerId};
use crate::events::RawEvent;

/// Buffered events per listener before delivery waits on the consumer
pub const LISTENER_CAPACITY: usize = 64;

/// Fan-out table from channel name to attached listeners
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<String, Vec<(ListenerId, mpsc::Sender<RawEvent>)>>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new listener to `stream`
    pub async fn register(&self, stream: &str) -> Listener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);

        self.listeners
            .write()
            .await
            .entry(stream.to_string())
            .or_default()
            .push((id, tx));

        debug!(stream, ?id, "listener registered");
        Listener { id, events: rx }
    }

    /// Detach a listener; returns false if it was not attached
    pub async fn remove(&self, stream: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().await;
        let Some(entries) = listeners.get_mut(stream) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            listeners.remove(stream);
        }

        debug!(stream, ?id, removed, "listener removed");
        removed
    }

    /// Number of listeners attached to `stream`
    pub async fn count(&self, stream: &str) -> usize {
        self.listeners
            .read()
            .await
            .get(stream)
            .map_or(0, Vec::len)
    }

    /// Deliver an event to every listener of its channel, in attach order.
    ///
    /// Returns how many listeners received it.
    pub async fn dispatch(&self, event: RawEvent) -> usize {
        let senders: Vec<_> = match self.listeners.read().await.get(&event.stream) {
            Some(entries) => entries.iter().map(|(_, tx)| tx.clone()).collect(),
            None => {
                trace!(stream = %event.stream, "no listener for event");
                return 0;
            }
        };

        let mut delivered = 0;
        for tx in senders {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_reaches_matching_stream_only() {
        let registry = ListenerRegistry::new();
        let mut com = registry.register("com").await;
        let mut fac = registry.register("fac").await;

        let delivered = registry
            .dispatch(RawEvent::new("com", vec![json!("push"), json!(0.5)]))
            .await;
        assert_eq!(delivered, 1);

        let event = com.events.recv().await.unwrap();
        assert_eq!(event.stream, "com");
        assert!(fac.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_closes_receiver() {
        let registry = ListenerRegistry::new();
        let mut listener = registry.register("fac").await;
        assert_eq!(registry.count("fac").await, 1);

        assert!(registry.remove("fac", listener.id).await);
        assert!(!registry.remove("fac", listener.id).await);
        assert_eq!(registry.count("fac").await, 0);

        assert!(listener.events.recv().await.is_none());
        assert_eq!(registry.dispatch(RawEvent::new("fac", vec![])).await, 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = ListenerRegistry::new();
        let a = registry.register("com").await;
        let b = registry.register("com").await;
        assert_ne!(a.id, b.id);
        assert_eq!(registry.count("com").await, 2);
    }
}
