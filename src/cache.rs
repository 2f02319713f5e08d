//! Read-through cache for listing views.
//!
//! Components receive the cache as an `Arc<dyn Cache>` capability through
//! [`AppState`](crate::state::AppState). Callers treat every operation as best
//! effort: a miss or a failed write never fails the surrounding request.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    /// Removes every entry whose key starts with `prefix`, returning how many were dropped.
    async fn delete_by_prefix(&self, prefix: &str) -> usize;
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((expires_at, _)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((_, value)) => Some(value.clone()),
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        // `get` only evicts the key it reads; sweep the rest here.
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(key.to_string(), (now + ttl, value));
    }

    async fn delete_by_prefix(&self, prefix: &str) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let mut removed = 0;
        entries.retain(|key, (expires_at, _)| {
            if key.starts_with(prefix) {
                removed += 1;
                return false;
            }
            *expires_at > now
        });
        removed
    }
}

pub fn buyer_orders_prefix(buyer_id: uuid::Uuid) -> String {
    format!("orders:buyer:{buyer_id}:")
}

pub const SEARCH_PREFIX: &str = "search:";
pub const STORES_PREFIX: &str = "stores:";

pub async fn invalidate(cache: &dyn Cache, prefixes: &[&str]) {
    for prefix in prefixes {
        let removed = cache.delete_by_prefix(prefix).await;
        if removed > 0 {
            tracing::debug!(prefix, removed, "cache entries invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = InMemoryCache::new();
        cache.set("k", json!(1), Duration::from_millis(0)).await;
        assert!(cache.get("k").await.is_none());

        cache.set("k", json!(2), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_by_prefix_only_touches_matching_keys() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("orders:buyer:1:page:1", json!([]), ttl).await;
        cache.set("orders:buyer:1:page:2", json!([]), ttl).await;
        cache.set("orders:buyer:2:page:1", json!([]), ttl).await;
        cache.set("search:shoes", json!([]), ttl).await;

        assert_eq!(cache.delete_by_prefix("orders:buyer:1:").await, 2);
        assert!(cache.get("orders:buyer:2:page:1").await.is_some());
        assert!(cache.get("search:shoes").await.is_some());
    }

    #[tokio::test]
    async fn writes_and_invalidations_sweep_expired_keys() {
        let cache = InMemoryCache::new();
        cache.set("orders:buyer:1:page:1", json!([]), Duration::ZERO).await;
        cache.set("search:old", json!([]), Duration::ZERO).await;
        cache.set("search:new", json!([]), Duration::from_secs(60)).await;
        assert_eq!(cache.entries.lock().await.len(), 1);

        cache.set("stores:stale", json!([]), Duration::ZERO).await;
        assert_eq!(cache.delete_by_prefix("orders:").await, 0);
        let entries = cache.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("search:new"));
    }
}
