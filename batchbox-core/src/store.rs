//! Cache store abstraction used to memoize resolved values.

use std::sync::Arc;

/// Key-value store holding previously resolved values.
///
/// All methods take `&self`: stores are shared between the request path and
/// the flush task and must synchronize internally.
pub trait CacheStore<K, V>: Send + Sync + 'static {
    /// Returns a clone of the value stored under `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: K, value: V);

    /// Removes the entry for `key`. Missing keys are ignored.
    fn delete(&self, key: &K);

    /// Removes every entry.
    fn clear(&self);

    /// Returns `true` if `key` has an entry.
    fn has(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K, V, S> CacheStore<K, V> for Arc<S>
where
    S: CacheStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn set(&self, key: K, value: V) {
        (**self).set(key, value)
    }

    fn delete(&self, key: &K) {
        (**self).delete(key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn has(&self, key: &K) -> bool {
        (**self).has(key)
    }
}
