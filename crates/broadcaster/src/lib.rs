//! Live Broadcaster
//!
//! Fans out qualifying Events to WebSocket subscribers. Each subscriber
//! gets a bounded `mpsc` channel instead of sharing one `broadcast`
//! channel, because `broadcast` has no way to drop a single lagging
//! subscriber without also lagging every other one — here a full channel
//! just drops that one subscriber.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use whale_core::sink::EventSink;
use whale_core::types::Event;

pub type SubscriberId = Uuid;

/// Bounded per-subscriber channel capacity; configurable so a deployment
/// with especially bursty whales can size it up.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub struct Broadcaster {
    subscribers: Arc<DashMap<SubscriberId, mpsc::Sender<Event>>>,
    capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { subscribers: Arc::new(DashMap::new()), capacity }
    }

    /// Registers a new subscriber and returns the receiving end of its
    /// bounded channel, typically handed off to a WebSocket write task.
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Event>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Broadcasts to a snapshot of current subscribers so a slow sink
    /// write never holds the registry lock against new subscribes.
    pub fn broadcast(&self, event: Event) {
        let targets: Vec<SubscriberId> = self.subscribers.iter().map(|e| *e.key()).collect();
        for id in targets {
            let Some(sender) = self.subscribers.get(&id).map(|e| e.value().clone()) else { continue };
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, "dropping lagging subscriber");
                    self.subscribers.remove(&id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.subscribers.remove(&id);
                }
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for Broadcaster {
    async fn publish(&self, event: Event) {
        self.broadcast(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use whale_core::types::EventType;

    fn sample_event() -> Event {
        Event {
            id: Uuid::new_v4(),
            whale_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: EventType::LargeSwap,
            summary: "test".to_string(),
            value_usd: Decimal::from(1000),
            tx_hash: None,
            details: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_broadcast_event() {
        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.subscribe();
        broadcaster.broadcast(sample_event());
        let received = rx.recv().await;
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn full_channel_drops_subscriber_without_blocking() {
        let broadcaster = Broadcaster::with_capacity(1);
        let (id, mut rx) = broadcaster.subscribe();
        broadcaster.broadcast(sample_event());
        broadcaster.broadcast(sample_event());
        assert_eq!(broadcaster.subscriber_count(), 0);
        // The one buffered event is still readable; the second was dropped
        // along with the subscriber, not blocked on.
        assert!(rx.recv().await.is_some());
        let _ = id;
    }

    #[tokio::test]
    async fn unsubscribe_removes_entry() {
        let broadcaster = Broadcaster::new();
        let (id, _rx) = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
        broadcaster.unsubscribe(id);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
