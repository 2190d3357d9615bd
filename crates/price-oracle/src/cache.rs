//! Process-wide spot price cache with per-asset TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::time::Duration;

struct Entry {
    price: Decimal,
    fetched_at: DateTime<Utc>,
}

pub struct SpotCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl SpotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn get(&self, asset: &str) -> Option<Decimal> {
        let entry = self.entries.get(asset)?;
        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.to_std().unwrap_or(Duration::MAX) > self.ttl {
            None
        } else {
            Some(entry.price)
        }
    }

    pub fn put(&self, asset: &str, price: Decimal) {
        self.entries.insert(asset.to_string(), Entry { price, fetched_at: Utc::now() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache = SpotCache::new(Duration::from_secs(300));
        cache.put("BTC", Decimal::from(50_000));
        assert_eq!(cache.get("BTC"), Some(Decimal::from(50_000)));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = SpotCache::new(Duration::from_secs(0));
        cache.put("BTC", Decimal::from(50_000));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("BTC"), None);
    }

    #[test]
    fn missing_entry_is_none() {
        let cache = SpotCache::new(Duration::from_secs(300));
        assert_eq!(cache.get("ETH"), None);
    }
}
