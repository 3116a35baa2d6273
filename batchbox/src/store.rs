//! In-memory [`CacheStore`] backed by [`DashMap`].

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::CacheStore;

/// Unbounded concurrent in-memory store.
///
/// Cloning is cheap and clones share the same entries, which makes it easy to
/// keep a handle for inspecting what the scheduler has cached.
///
/// Entries are never evicted on their own; use
/// [`evict`](crate::BatchScheduler::evict) or reach for `batchbox-moka` when the
/// key space is unbounded.
#[derive(Debug)]
pub struct DashMapStore<K, V>
where
    K: Eq + Hash,
{
    entries: Arc<DashMap<K, V>>,
}

impl<K, V> DashMapStore<K, V>
where
    K: Eq + Hash,
{
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Clone for DashMapStore<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for DashMapStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheStore<K, V> for DashMapStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}
