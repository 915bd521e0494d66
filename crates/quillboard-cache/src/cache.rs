use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

struct Entry {
    value: serde_json::Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Thread-safe in-memory cache with per-entry TTL
///
/// Values are stored as JSON so a single cache instance can hold
/// mixed payload types. Keys are plain strings; for parameterized
/// queries use [`MemoryCache::query_key`] so the same parameters
/// always map to the same entry.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Build a cache key from a prefix and serialized query parameters
    pub fn query_key<P: Serialize>(prefix: &str, params: &P) -> String {
        let serialized = serde_json::to_string(params).unwrap_or_else(|_| "{}".to_string());
        format!("{}_{}", prefix, serialized)
    }

    /// Store a value with the given TTL
    pub fn insert<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    /// Fetch a value if it exists and has not expired
    ///
    /// Expired entries are dropped on access. A value that no longer
    /// deserializes into `T` is treated as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().ok()?;

        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            entries.remove(key);
            return None;
        }

        let entry = entries.get(key)?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Cache entry for {} failed to deserialize: {}", key, e);
                None
            }
        }
    }

    /// Remove a single entry
    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Drop every entry whose key contains the given pattern
    ///
    /// Used for invalidation after mutations, e.g. clearing all
    /// `post_types_*` entries after a post type is created.
    pub fn clear_matching(&self, pattern: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| !key.contains(pattern));
        }
    }

    /// Drop everything
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of live (possibly expired but not yet evicted) entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = MemoryCache::new();
        cache
            .insert("key", &vec!["a", "b"], Duration::from_secs(60))
            .unwrap();

        let value: Option<Vec<String>> = cache.get("key");
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.insert("key", &42u32, Duration::from_millis(0)).unwrap();

        std::thread::sleep(Duration::from_millis(10));

        let value: Option<u32> = cache.get("key");
        assert_eq!(value, None);
        // Expired entry should have been evicted on access
        assert!(cache.is_empty());
    }

    #[test]
    fn test_query_key_is_stable() {
        #[derive(serde::Serialize)]
        struct Params {
            page: u32,
            limit: u32,
        }

        let a = MemoryCache::query_key("stories", &Params { page: 1, limit: 10 });
        let b = MemoryCache::query_key("stories", &Params { page: 1, limit: 10 });
        let c = MemoryCache::query_key("stories", &Params { page: 2, limit: 10 });

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clear_matching() {
        let cache = MemoryCache::new();
        cache
            .insert("post_types_all", &1u32, Duration::from_secs(60))
            .unwrap();
        cache
            .insert("post_types_slug_events", &2u32, Duration::from_secs(60))
            .unwrap();
        cache
            .insert("fields_abc", &3u32, Duration::from_secs(60))
            .unwrap();

        cache.clear_matching("post_types_");

        assert_eq!(cache.get::<u32>("post_types_all"), None);
        assert_eq!(cache.get::<u32>("post_types_slug_events"), None);
        assert_eq!(cache.get::<u32>("fields_abc"), Some(3));
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .insert("key", &"not a number", Duration::from_secs(60))
            .unwrap();

        let value: Option<u32> = cache.get("key");
        assert_eq!(value, None);
    }
}
