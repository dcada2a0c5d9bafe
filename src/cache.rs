//! Read-through cache used by the model registry.
//!
//! Every cache in the crate goes through [`Cache`], configured by a
//! [`CachePolicy`]: bounded (LRU) or unbounded, with an optional TTL, or
//! disabled altogether. All caches can be dropped with [`Cache::invalidate`].

use crate::error::Result;
use lru::LruCache;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub capacity: Option<NonZeroUsize>,
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    /// Keep everything until invalidated.
    pub fn unbounded() -> Self {
        Self {
            enabled: true,
            capacity: None,
            ttl: None,
        }
    }

    /// Keep at most `capacity` entries, evicting the least recently used.
    /// A capacity of zero disables the cache.
    pub fn bounded(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(capacity) => Self {
                enabled: true,
                capacity: Some(capacity),
                ttl: None,
            },
            None => Self::disabled(),
        }
    }

    /// Every lookup goes to the source.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            capacity: None,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct Cache<K: Hash + Eq, V: Clone> {
    policy: CachePolicy,
    entries: Mutex<LruCache<K, Entry<V>>>,
}

impl<K: Hash + Eq, V: Clone> Cache<K, V> {
    pub fn new(policy: CachePolicy) -> Self {
        let entries = match policy.capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            policy,
            entries: Mutex::new(entries),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        if !self.policy.enabled {
            return None;
        }

        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        if !self.policy.enabled {
            return;
        }
        let entry = Entry {
            value,
            stored_at: Instant::now(),
        };
        self.entries.lock().await.put(key, entry);
    }

    /// Returns the cached value or runs `fetch` and stores its result.
    ///
    /// The lock is not held while `fetch` runs, so two concurrent misses may
    /// both fetch; the later insert wins. Errors are never cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, entry: &Entry<V>) -> bool {
        self.policy
            .ttl
            .map_or(false, |ttl| entry.stored_at.elapsed() >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let cache: Cache<&str, u32> = Cache::new(CachePolicy::unbounded());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: Cache<&str, u32> = Cache::new(CachePolicy::unbounded());
        let first = cache
            .get_or_fetch("k", || async { Err(BotError::RemoteCall("down".into())) })
            .await;
        assert!(first.is_err());
        assert!(cache.is_empty().await);

        let second = cache.get_or_fetch("k", || async { Ok(1) }).await.unwrap();
        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn test_bounded_cache_evicts_least_recently_used() {
        let cache: Cache<u32, u32> = Cache::new(CachePolicy::bounded(16));
        for i in 0..16 {
            cache.insert(i, i).await;
        }
        // touch 0 so that 1 becomes the oldest
        assert_eq!(cache.get(&0).await, Some(0));
        cache.insert(16, 16).await;

        assert_eq!(cache.len().await, 16);
        assert_eq!(cache.get(&1).await, None);
        assert_eq!(cache.get(&0).await, Some(0));
        assert_eq!(cache.get(&16).await, Some(16));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let cache: Cache<&str, u32> = Cache::new(CachePolicy::disabled());
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            cache
                .get_or_fetch("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(CachePolicy::bounded(0), CachePolicy::disabled());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache: Cache<&str, u32> =
            Cache::new(CachePolicy::unbounded().with_ttl(Duration::from_millis(20)));
        cache.insert("k", 1).await;
        assert_eq!(cache.get(&"k").await, Some(1));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get(&"k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_clears_everything() {
        let cache: Cache<u32, u32> = Cache::new(CachePolicy::bounded(4));
        cache.insert(1, 1).await;
        cache.insert(2, 2).await;
        cache.invalidate().await;
        assert!(cache.is_empty().await);
    }
}
