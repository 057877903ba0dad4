// src/cache.rs

//! Process-wide TTL cache.
//!
//! Entries expire lazily: a read past the expiry time behaves like a miss and
//! drops the entry. There is no capacity bound and no background eviction,
//! the key space being one entry per school/option-type/region actually
//! queried.
//!
//! [`CacheStore::get_or_fill`] serializes fills per key, so concurrent
//! requests for the same cold key share a single upstream fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Fill lock for one key. The flag records that a fill ran to completion
/// under this lock without producing a value.
type FillLock = Arc<Mutex<bool>>;

/// String-keyed cache with per-entry expiry.
pub struct CacheStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
    inflight: DashMap<String, FillLock>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    /// Return the live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached value, or run `fill` and cache its result.
    ///
    /// Only one fill per key runs at a time. Callers arriving while a fill is
    /// in progress wait for it and take its outcome: the cached value, or
    /// `None` when that fill came back empty. A fill yielding `None` is not
    /// cached, so the next caller after the waiters have drained tries again.
    pub async fn get_or_fill<F>(&self, key: &str, ttl: Duration, fill: F) -> Option<V>
    where
        F: Future<Output = Option<V>>,
    {
        if let Some(value) = self.get(key) {
            return Some(value);
        }

        let slot = InflightSlot::join(&self.inflight, key);
        let mut failed = slot.lock.lock().await;

        if let Some(value) = self.get(key) {
            log::debug!("[Cache] {key} filled by a concurrent request");
            return Some(value);
        }
        if *failed {
            log::debug!("[Cache] {key} fill by a concurrent request came back empty");
            return None;
        }

        let value = fill.await;
        match &value {
            Some(value) => self.set(key, value.clone(), ttl),
            None => *failed = true,
        }
        value
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// One caller's hold on a key's fill lock. Dropping the last hold removes
/// the lock from the in-flight table, including when the caller is cancelled
/// mid-fill.
struct InflightSlot<'a> {
    table: &'a DashMap<String, FillLock>,
    key: String,
    lock: FillLock,
}

impl<'a> InflightSlot<'a> {
    fn join(table: &'a DashMap<String, FillLock>, key: &str) -> Self {
        let lock = Arc::clone(
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(false)))
                .value(),
        );
        Self {
            table,
            key: key.to_string(),
            lock,
        }
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        // Held by the table and by this slot only.
        self.table.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_lives_until_ttl() {
        let cache = CacheStore::new();
        cache.set("spmb_data_1_domisili", vec![1, 2, 3], Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("spmb_data_1_domisili"), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert_eq!(cache.get("spmb_data_1_domisili"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_absent() {
        let cache: CacheStore<String> = CacheStore::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fill_runs_once_until_expiry() {
        let cache = CacheStore::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fill = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Some("fresh".to_string())
        };

        let ttl = Duration::from_secs(300);
        assert_eq!(cache.get_or_fill("k", ttl, fill()).await.as_deref(), Some("fresh"));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_or_fill("k", ttl, fill()).await.as_deref(), Some("fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(ttl).await;
        cache.get_or_fill("k", ttl, fill()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fills_share_one_call() {
        let cache = CacheStore::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fill = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            Some(42u32)
        };

        let ttl = Duration::from_secs(60);
        let (a, b) = tokio::join!(
            cache.get_or_fill("k", ttl, fill()),
            cache.get_or_fill("k", ttl, fill())
        );
        assert_eq!((a, b), (Some(42), Some(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.is_empty());
    }

    #[tokio::test]
    async fn failed_fill_is_not_cached() {
        let cache: CacheStore<u32> = CacheStore::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(cache.get_or_fill("k", ttl, async { None }).await, None);
        assert_eq!(cache.get_or_fill("k", ttl, async { Some(7) }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_share_an_empty_fill() {
        let cache: CacheStore<u32> = CacheStore::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fill = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            None
        };

        let ttl = Duration::from_secs(60);
        let results = tokio::join!(
            cache.get_or_fill("k", ttl, fill()),
            cache.get_or_fill("k", ttl, fill()),
            cache.get_or_fill("k", ttl, fill())
        );
        assert_eq!(results, (None, None, None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.is_empty());

        // Later callers retry.
        cache.get_or_fill("k", ttl, fill()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_fill_releases_the_key() {
        let cache: CacheStore<u32> = CacheStore::new();
        let ttl = Duration::from_secs(60);

        let stalled = cache.get_or_fill("k", ttl, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Some(1)
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), stalled).await;
        assert!(timed_out.is_err());
        assert!(cache.inflight.is_empty());

        assert_eq!(cache.get_or_fill("k", ttl, async { Some(2) }).await, Some(2));
    }
}
