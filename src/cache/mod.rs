//! In-process cache for list query results.
//!
//! Entries are keyed by entity type plus the filter parameters that produced them, so a
//! mutation can drop every cached list of its entity type in one call.

use dashmap::DashMap;
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// Entity type prefixes used in cache keys
pub mod entity {
    pub const SUPPLIERS: &str = "suppliers";
    pub const CARRIERS: &str = "carriers";
    pub const DESTINATIONS: &str = "destinations";
    pub const ORDERS: &str = "orders";
    pub const CONTAINER_TYPES: &str = "container_types";
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache is disabled")]
    Disabled,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// TTL cache of serialized query results
#[derive(Debug, Clone)]
pub struct QueryCache {
    store: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    enabled: bool,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            enabled: config.enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl: Duration::ZERO,
            max_entries: 1,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Builds `entity?name=value&...`. Absent parameters render empty, so `None` and
    /// `Some("")` share a key.
    pub fn key(entity: &str, params: &[(&str, Option<&str>)]) -> String {
        let query = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", entity, query)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let raw = match self.store.get(key) {
            Some(entry) if !entry.is_expired() => entry.value.clone(),
            Some(_) => {
                self.store.remove(key);
                counter!("shiptrack_cache.expired", 1);
                return None;
            }
            None => {
                counter!("shiptrack_cache.misses", 1);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                counter!("shiptrack_cache.hits", 1);
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.store.remove(key);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        if !self.enabled {
            return Err(CacheError::Disabled);
        }
        let raw = serde_json::to_string(value)?;
        if !self.store.contains_key(key) && self.store.len() >= self.max_entries {
            self.make_room();
        }
        self.store
            .insert(key.to_string(), CacheEntry::new(raw, self.ttl));
        Ok(())
    }

    /// Sweeps expired entries, then evicts the entries closest to expiry until one slot is free.
    fn make_room(&self) {
        self.store.retain(|_, entry| !entry.is_expired());

        let excess = (self.store.len() + 1).saturating_sub(self.max_entries);
        if excess == 0 {
            return;
        }
        let mut by_expiry: Vec<(Instant, String)> = self
            .store
            .iter()
            .map(|entry| (entry.expires_at, entry.key().clone()))
            .collect();
        by_expiry.sort_unstable();
        for (_, key) in by_expiry.into_iter().take(excess) {
            self.store.remove(&key);
        }
        counter!("shiptrack_cache.evictions", excess as u64);
        debug!(evicted = excess, "Cache full, evicted oldest entries");
    }

    /// Stores `value`, logging instead of failing when it cannot be cached.
    pub fn remember<T: Serialize>(&self, key: &str, value: &T) {
        match self.put(key, value) {
            Ok(()) | Err(CacheError::Disabled) => {}
            Err(e) => warn!(key, error = %e, "Failed to cache query result"),
        }
    }

    /// Drops every entry cached for `entity`; returns how many were removed.
    pub fn invalidate_entity(&self, entity: &str) -> usize {
        let prefix = format!("{}?", entity);
        let before = self.store.len();
        self.store.retain(|key, _| !key.starts_with(&prefix));
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            debug!(entity, removed, "Invalidated cached queries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_ttl(ttl_secs: u64) -> QueryCache {
        QueryCache::new(&CacheConfig {
            enabled: true,
            ttl_secs,
            ..Default::default()
        })
    }

    #[test]
    fn keys_include_filter_parameters() {
        let a = QueryCache::key(entity::ORDERS, &[("search", Some("po")), ("status", None)]);
        let b = QueryCache::key(entity::ORDERS, &[("search", Some("po")), ("status", Some("pending"))]);
        assert_eq!(a, "orders?search=po&status=");
        assert_ne!(a, b);
    }

    #[test]
    fn invalidation_is_scoped_to_one_entity() {
        let cache = cache_with_ttl(60);
        cache
            .put(&QueryCache::key(entity::SUPPLIERS, &[("search", None)]), &vec![1, 2])
            .unwrap();
        cache
            .put(&QueryCache::key(entity::SUPPLIERS, &[("search", Some("ac"))]), &vec![1])
            .unwrap();
        cache
            .put(&QueryCache::key(entity::CARRIERS, &[("search", None)]), &vec![3])
            .unwrap();

        assert_eq!(cache.invalidate_entity(entity::SUPPLIERS), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get::<Vec<i32>>(&QueryCache::key(entity::CARRIERS, &[("search", None)])),
            Some(vec![3])
        );
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = QueryCache {
            store: Arc::new(DashMap::new()),
            ttl: Duration::ZERO,
            max_entries: 10,
            enabled: true,
        };
        cache.put("orders?", &"stale").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get::<String>("orders?"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn distinct_searches_cannot_grow_past_the_bound() {
        let cache = QueryCache::new(&CacheConfig {
            enabled: true,
            ttl_secs: 60,
            max_entries: 3,
        });
        for i in 0..50 {
            let search = format!("term-{}", i);
            cache
                .put(&QueryCache::key(entity::ORDERS, &[("search", Some(&search))]), &i)
                .unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.get::<i32>(&QueryCache::key(entity::ORDERS, &[("search", Some("term-49"))])),
            Some(49)
        );
        assert_eq!(
            cache.get::<i32>(&QueryCache::key(entity::ORDERS, &[("search", Some("term-0"))])),
            None
        );

        cache
            .put(&QueryCache::key(entity::ORDERS, &[("search", Some("term-49"))]), &490)
            .unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn expired_entries_are_swept_when_full() {
        let cache = QueryCache {
            store: Arc::new(DashMap::new()),
            ttl: Duration::ZERO,
            max_entries: 2,
            enabled: true,
        };
        cache.put("orders?a", &1).unwrap();
        cache.put("orders?b", &2).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.put("orders?c", &3).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.store.contains_key("orders?c"));
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache = QueryCache::disabled();
        assert!(matches!(cache.put("k", &1), Err(CacheError::Disabled)));
        cache.remember("k", &1);
        assert_eq!(cache.get::<i32>("k"), None);
    }
}
