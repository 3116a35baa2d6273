//! Moka store implementation.

use std::hash::Hash;

use batchbox_core::CacheStore;
use moka::sync::Cache;

use crate::builder::MokaStoreBuilder;
use crate::metrics;

/// Bounded in-memory cache store powered by Moka.
///
/// `MokaStore` keeps at most `max_capacity` entries and can expire them after
/// a time-to-live or time-to-idle. It uses Moka's synchronous cache, which
/// offers lock-free reads and fine-grained locking for writes, so it can be
/// consulted directly from the scheduler's request path.
///
/// Cloning is cheap; clones share the same entries.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use batchbox_moka::MokaStore;
///
/// let store: MokaStore<u64, String> = MokaStore::builder(10_000)
///     .time_to_live(Duration::from_secs(60))
///     .build();
/// ```
///
/// # Caveats
///
/// - Data is **not persisted**; the cache is lost on process restart
/// - Eviction is **best-effort**; Moka applies capacity limits in the
///   background, so the store may briefly hold more than `max_capacity`
///   entries
pub struct MokaStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// The underlying Moka cache instance.
    pub cache: Cache<K, V>,
    /// Label identifying this store in metrics and debug output.
    pub label: &'static str,
}

impl<K, V> Clone for MokaStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            label: self.label,
        }
    }
}

impl<K, V> std::fmt::Debug for MokaStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .field("max_capacity", &self.cache.policy().max_capacity())
            .finish()
    }
}

impl<K, V> MokaStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new builder for a store holding at most `max_capacity` entries.
    pub fn builder(max_capacity: u64) -> MokaStoreBuilder<K, V> {
        MokaStoreBuilder::new(max_capacity)
    }

    /// Approximate number of entries currently stored.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions and expirations now.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
        self.record_capacity();
    }

    fn record_capacity(&self) {
        metrics::record_capacity(self.label, self.cache.entry_count());
    }
}

impl<K, V> CacheStore<K, V> for MokaStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    fn set(&self, key: K, value: V) {
        self.cache.insert(key, value);
        self.record_capacity();
    }

    fn delete(&self, key: &K) {
        self.cache.invalidate(key);
        self.record_capacity();
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.record_capacity();
    }

    fn has(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }
}
