//! Main cache store implementation with TTL validity, LRU eviction and
//! single-flight population

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    invalidation::{InvalidationEvent, InvalidationReason},
    types::CacheStats,
};
use crate::error::{AssistError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of a spawned load, shared by every caller that missed on the same key
type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Keyed TTL cache safe for concurrent use from many sessions
///
/// - Valid entries are returned without running the loader
/// - Concurrent misses on one key collapse into a single loader call
/// - Failed loads store nothing and leave any previous entry in place
/// - Loads run as their own task and finish even if every caller goes away
/// - LRU eviction once `max_entries` is reached
pub struct TtlCache<K, V> {
    name: &'static str,

    /// Cache configuration
    pub(crate) config: CacheConfig,

    /// Internal storage, never locked across a loader call
    store: Arc<Mutex<CacheStore<K, V>>>,
}

/// Internal cache storage
struct CacheStore<K, V> {
    /// Main storage: key -> entry
    entries: HashMap<K, CacheEntry<V>>,

    /// LRU tracking: maintains access order
    lru_queue: VecDeque<K>,

    /// Loads currently running, by key
    in_flight: HashMap<K, Flight<V>>,

    /// Current cache statistics
    stats: CacheStats,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    fn lookup(&mut self, key: &K, touch_lru: bool) -> Option<V>
    where
        V: Clone,
    {
        let expired = match self.entries.get_mut(key) {
            Some(entry) if entry.is_valid() => {
                entry.mark_accessed();
                let value = entry.value.clone();
                self.stats.hits += 1;
                if touch_lru {
                    self.lru_queue.retain(|k| k != key);
                    self.lru_queue.push_back(key.clone());
                }
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.evictions_ttl += 1;
        }
        self.stats.misses += 1;
        None
    }

    fn install(
        &mut self,
        key: K,
        value: V,
        ttl: Duration,
        max_entries: usize,
    ) -> Option<InvalidationEvent> {
        let entry = CacheEntry::new(value, ttl);
        let mut evicted = 0;

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            self.lru_queue.retain(|k| k != &key);
            self.lru_queue.push_back(key);
        } else {
            while self.entries.len() >= max_entries {
                let Some(oldest) = self.lru_queue.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                self.stats.evictions_size += 1;
                evicted += 1;
            }
            self.entries.insert(key.clone(), entry);
            self.lru_queue.push_back(key);
        }

        self.stats.entries = self.entries.len();
        (evicted > 0).then(|| InvalidationEvent::new(InvalidationReason::SizeLimit, evicted))
    }

    fn remove_entry(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru_queue.retain(|k| k != key);
            self.stats.entries = self.entries.len();
        }
        removed
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new cache; rejects an invalid configuration with `ConfigError`
    pub fn new(name: &'static str, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        info!(
            cache = name,
            ttl_secs = config.default_ttl.as_secs_f64(),
            max_entries = config.max_entries,
            "Initializing cache"
        );

        let store = CacheStore {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            in_flight: HashMap::new(),
            stats: CacheStats::default(),
        };

        Ok(Self {
            name,
            config,
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Name used in log lines
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a valid value from the cache
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().await;
        let value = store.lookup(key, self.config.enable_lru_eviction);
        debug!(cache = self.name, ?key, hit = value.is_some(), "Cache lookup");
        value
    }

    /// Return the valid entry for `key`, or run `init` to produce and store one
    ///
    /// At most one `init` runs per key at a time. Callers that miss while a
    /// load is running wait for it and receive the same value or error.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = {
            let mut guard = self.store.lock().await;
            let store = &mut *guard;

            if let Some(value) = store.lookup(&key, self.config.enable_lru_eviction) {
                debug!(cache = self.name, ?key, "Cache hit");
                return Ok(value);
            }

            if let Some(flight) = store.in_flight.get(&key) {
                debug!(cache = self.name, ?key, "Joining in-flight load");
                store.stats.coalesced += 1;
                flight.clone()
            } else {
                debug!(cache = self.name, ?key, "Cache miss, loading");
                let flight = self.launch(key.clone(), init());
                store.in_flight.insert(key, flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Spawn a loader that installs its own result when it completes
    ///
    /// The task owns the load, so dropping every waiter does not stall it or
    /// leave its key in `in_flight`.
    fn launch<Fut>(&self, key: K, load: Fut) -> Flight<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let name = self.name;
        let ttl = self.config.ttl_with_jitter();
        let max_entries = self.config.max_entries;
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let result = AssertUnwindSafe(load).catch_unwind().await.unwrap_or_else(|_| {
                Err(AssistError::Other(format!("{name}: loader panicked")))
            });

            let mut store = store.lock().await;
            store.in_flight.remove(&key);
            match &result {
                Ok(value) => {
                    if let Some(event) = store.install(key, value.clone(), ttl, max_entries) {
                        debug!(
                            cache = name,
                            evicted = event.count,
                            reason = %event.reason,
                            "Made room"
                        );
                    }
                }
                Err(e) => {
                    store.stats.failures += 1;
                    warn!(cache = name, ?key, error = %e, "Load failed, nothing cached");
                }
            }

            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                error!(cache = name, key = ?task_key, error = %e, "Load task did not finish");
                Err(AssistError::Other(format!("{name}: load task failed: {e}")))
            })
        }
        .boxed()
        .shared()
    }

    /// Store a value, replacing any existing entry for the key
    ///
    /// Returns the `SizeLimit` event when older entries had to be evicted.
    pub async fn insert(&self, key: K, value: V) -> Option<InvalidationEvent> {
        let mut store = self.store.lock().await;
        debug!(cache = self.name, ?key, "Storing entry");
        store.install(key, value, self.config.ttl_with_jitter(), self.config.max_entries)
    }

    /// Replace the entry for `key` ahead of its expiry, restarting its TTL
    ///
    /// Returns a `Refreshed` event when a stored entry was displaced.
    pub async fn refresh(&self, key: K, value: V) -> Option<InvalidationEvent> {
        let mut store = self.store.lock().await;
        let replaced = store.entries.contains_key(&key);
        let evicted = store.install(
            key,
            value,
            self.config.ttl_with_jitter(),
            self.config.max_entries,
        );

        if !replaced {
            return evicted;
        }
        info!(cache = self.name, "Entry replaced by refresh");
        Some(InvalidationEvent::new(InvalidationReason::Refreshed, 1).with_context(self.name))
    }

    /// Remove a specific entry from the cache
    pub async fn invalidate(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().await;
        let removed = store.remove_entry(key)?;
        store.stats.invalidations += 1;
        debug!(cache = self.name, ?key, "Invalidated entry");
        Some(removed.value)
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) -> InvalidationEvent {
        let mut store = self.store.lock().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.entries = 0;
        store.stats.invalidations += count as u64;

        info!(cache = self.name, count, "Cleared cache");
        InvalidationEvent::new(InvalidationReason::Cleared, count)
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> Vec<InvalidationEvent> {
        let mut store = self.store.lock().await;

        let expired_keys: Vec<K> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        if expired_keys.is_empty() {
            return Vec::new();
        }

        for key in &expired_keys {
            store.remove_entry(key);
        }
        store.stats.evictions_ttl += expired_keys.len() as u64;

        debug!(cache = self.name, count = expired_keys.len(), "Cleaned up expired entries");
        vec![
            InvalidationEvent::new(InvalidationReason::Expired, expired_keys.len())
                .with_context(format!("{}: cleanup pass", self.name)),
        ]
    }

    /// Check whether a valid entry exists (without counting a hit)
    pub async fn contains_key(&self, key: &K) -> bool {
        let store = self.store.lock().await;
        store.entries.get(key).is_some_and(|e| e.is_valid())
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.lock().await;
        store.stats.clone()
    }

    /// Number of stored entries, including expired ones not yet cleaned up
    pub async fn len(&self) -> usize {
        let store = self.store.lock().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.store.lock().await;
        store.entries.is_empty()
    }

    /// Number of loads currently running
    pub async fn in_flight(&self) -> usize {
        let store = self.store.lock().await;
        store.in_flight.len()
    }
}

/// Background task for automatic cache cleanup
pub async fn start_auto_cleanup<K, V>(cache: Arc<TtlCache<K, V>>)
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let interval = cache.config.cleanup_interval;

    info!(cache = cache.name, ?interval, "Starting automatic cache cleanup task");

    loop {
        tokio::time::sleep(interval).await;

        let events = cache.cleanup_expired().await;
        if !events.is_empty() {
            debug!(cache = cache.name, events = events.len(), "Auto cleanup");
        }
    }
}
