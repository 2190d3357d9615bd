//! Shared contract implemented by the EVM, UTXO and PERP collectors.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use whale_core::Result;

/// What one tick produced, logged by the caller (scheduler or the
/// standalone tick loop) rather than by the collector itself.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub whales_processed: usize,
    pub trades_persisted: usize,
    pub events_emitted: usize,
    pub decode_errors: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.whales_processed += other.whales_processed;
        self.trades_persisted += other.trades_persisted;
        self.events_emitted += other.events_emitted;
        self.decode_errors += other.decode_errors;
    }
}

/// On every tick: load checkpoints, fetch strictly-newer source records,
/// normalize, dedupe, upsert + advance checkpoint in one transaction, then
/// emit events after commit. Implementations own their own per-whale
/// in-flight state (the way `TradeMonitor` keeps a `DashMap` of recent
/// trades per wallet) and must be cheap to clone for spawning onto a task.
#[async_trait]
pub trait Collector: Send + Sync {
    fn chain(&self) -> whale_core::types::Chain;

    async fn tick(&self) -> Result<TickReport>;
}

/// Cooperative on/off switch shared between the owning task and whatever
/// supervises it (the scheduler, or a shutdown signal).
#[derive(Clone)]
pub struct ActiveFlag(Arc<RwLock<bool>>);

impl ActiveFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(RwLock::new(active)))
    }

    pub async fn is_active(&self) -> bool {
        *self.0.read().await
    }

    pub async fn set(&self, active: bool) {
        *self.0.write().await = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn active_flag_toggles() {
        let flag = ActiveFlag::new(true);
        assert!(flag.is_active().await);
        flag.set(false).await;
        assert!(!flag.is_active().await);
    }

    #[test]
    fn tick_report_merges() {
        let mut a = TickReport { whales_processed: 1, trades_persisted: 2, events_emitted: 1, decode_errors: 0 };
        let b = TickReport { whales_processed: 2, trades_persisted: 3, events_emitted: 0, decode_errors: 1 };
        a.merge(b);
        assert_eq!(a.whales_processed, 3);
        assert_eq!(a.trades_persisted, 5);
        assert_eq!(a.events_emitted, 1);
        assert_eq!(a.decode_errors, 1);
    }
}
