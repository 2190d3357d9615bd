//! Shared event-sink abstraction so collectors, the scheduler and the
//! copier can emit to the Live Broadcaster without depending on its crate
//! directly — only `api-server` wires the concrete broadcaster in.

use async_trait::async_trait;

use crate::types::Event;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: Event);
}

/// Used wherever a sink is optional (tests, or a collector run standalone
/// without a broadcaster wired up).
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _event: Event) {}
}
