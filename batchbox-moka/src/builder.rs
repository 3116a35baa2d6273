//! Builder for configuring [`MokaStore`].

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use crate::store::MokaStore;

/// Builder for creating and configuring a [`MokaStore`].
///
/// Use [`MokaStore::builder`] to create a new builder instance.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use batchbox_moka::{EvictionPolicy, MokaStore};
///
/// let store: MokaStore<String, Vec<u8>> = MokaStore::builder(50_000)
///     .label("users")
///     .time_to_idle(Duration::from_secs(300))
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// ```
pub struct MokaStoreBuilder<K, V> {
    max_capacity: u64,
    time_to_live: Option<Duration>,
    time_to_idle: Option<Duration>,
    eviction_policy: Option<EvictionPolicy>,
    label: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MokaStoreBuilder<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder for a store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            time_to_live: None,
            time_to_idle: None,
            eviction_policy: None,
            label: "moka",
            _marker: PhantomData,
        }
    }

    /// Sets a custom label for this store.
    ///
    /// The label appears in metrics and debug output.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Expire entries this long after they were stored.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Expire entries this long after they were last read or stored.
    pub fn time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    /// Sets the eviction policy for the store.
    ///
    /// # Default
    ///
    /// [`EvictionPolicy::tiny_lfu()`] - combines LRU eviction with LFU
    /// admission for optimal hit rates
    ///
    /// # Options
    ///
    /// | Policy | Description | Best for |
    /// |--------|-------------|----------|
    /// | [`tiny_lfu()`](EvictionPolicy::tiny_lfu) | LRU eviction + LFU admission | General caching |
    /// | [`lru()`](EvictionPolicy::lru) | Pure least-recently-used | Recency-biased data |
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Builds the [`MokaStore`].
    pub fn build(self) -> MokaStore<K, V> {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let mut builder = Cache::builder()
            .max_capacity(self.max_capacity)
            .eviction_policy(policy);
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = self.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        MokaStore {
            cache: builder.build(),
            label: self.label,
        }
    }
}
