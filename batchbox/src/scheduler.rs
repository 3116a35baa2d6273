//! Batch scheduler: request intake, timer arming and the flush algorithm.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{JoinAll, TryJoinAll, join_all, try_join_all};
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::config::SchedulerConfig;
use crate::error::{ConfigError, LoadError};
use crate::future::{LoadFuture, Settle};
use crate::metrics::{self, FlushOutcome};
use crate::{CacheStore, Fetch};

type SharedStore<K, V> = Arc<dyn CacheStore<K, V>>;

/// A key waiting for its batch to be flushed.
struct PendingRequest<K, V, E> {
    key: K,
    settle: Settle<V, E>,
}

/// One position in the key list sent to the fetch, with every request
/// waiting on it.
struct Slot<K, V, E> {
    key: K,
    waiters: Vec<Settle<V, E>>,
}

impl<K, V, E> Slot<K, V, E>
where
    V: Clone,
{
    fn resolve(self, value: V) {
        for waiter in self.waiters {
            let _ = waiter.send(Ok(value.clone()));
        }
    }

    fn reject(self, err: &LoadError<E>) {
        for waiter in self.waiters {
            let _ = waiter.send(Err(err.clone()));
        }
    }
}

/// State guarded by the scheduler lock.
///
/// A non-empty queue always has exactly one timer task armed for it.
struct State<K, V, E> {
    queue: Vec<PendingRequest<K, V, E>>,
    last_flush: Instant,
}

struct Inner<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    fetch: F,
    config: SchedulerConfig,
    cache: Option<SharedStore<K, F::Value>>,
    state: Mutex<State<K, F::Value, F::Error>>,
}

/// Batches key requests arriving within an interval into single fetch calls.
///
/// Every call to [`request_one`](Self::request_one) that misses the cache is
/// queued. The first request entering an empty queue arms a timer which
/// fires once the configured interval has passed since the previous flush;
/// the flush then sends the whole queue to the [`Fetch`] in one call and
/// settles each request from its result slot.
///
/// Cloning is cheap; clones share the same queue and cache.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use batchbox::{BatchScheduler, fetch_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = BatchScheduler::builder(fetch_fn(|keys: Vec<u64>| async move {
///     Ok::<_, std::io::Error>(keys.into_iter().map(|key| Ok(key * 2)).collect())
/// }))
/// .interval(Duration::from_millis(5))
/// .build()
/// .unwrap();
///
/// let values = scheduler.request_many([1, 2, 3]).await.unwrap();
/// assert_eq!(values, vec![2, 4, 6]);
/// # }
/// ```
pub struct BatchScheduler<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    inner: Arc<Inner<K, F>>,
}

impl<K, F> Clone for BatchScheduler<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, F> std::fmt::Debug for BatchScheduler<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache.as_ref().map(|_| "..."))
            .field("pending", &self.pending_len())
            .finish()
    }
}

impl<K, F> BatchScheduler<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    /// Creates a new [`BatchSchedulerBuilder`] around `fetch`.
    pub fn builder(fetch: F) -> BatchSchedulerBuilder<K, F> {
        BatchSchedulerBuilder::new(fetch)
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Number of requests waiting in the open batch.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Request the value for `key`.
    ///
    /// The key is queued immediately, before the returned future is polled,
    /// so several un-awaited calls end up in the same batch. With caching
    /// enabled a cached value is returned without queueing.
    ///
    /// Must be called from within a Tokio runtime: the first request of a
    /// batch spawns the flush timer.
    pub fn request_one(&self, key: K) -> LoadFuture<F::Value, F::Error> {
        let (future, pending) = self.inner.admit(key);
        if let Some(request) = pending {
            self.inner.enqueue(vec![request]);
        }
        future
    }

    /// Request the values for `keys`, failing on the first error.
    ///
    /// Results are aligned with `keys` by position. Every key missing from
    /// the cache is queued in one step before this call returns, so the keys
    /// of a single call are never split across batches.
    pub fn request_many<I>(&self, keys: I) -> TryJoinAll<LoadFuture<F::Value, F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        try_join_all(self.admit_many(keys))
    }

    /// Request the values for `keys`, settling each key independently.
    ///
    /// Result `i` belongs to the `i`-th key.
    pub fn request_many_settled<I>(&self, keys: I) -> JoinAll<LoadFuture<F::Value, F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        join_all(self.admit_many(keys))
    }

    fn admit_many<I>(&self, keys: I) -> Vec<LoadFuture<F::Value, F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let keys = keys.into_iter();
        let mut futures = Vec::with_capacity(keys.size_hint().0);
        let mut misses = Vec::new();
        for key in keys {
            let (future, pending) = self.inner.admit(key);
            futures.push(future);
            misses.extend(pending);
        }
        self.inner.enqueue(misses);
        futures
    }

    /// Remove `key` from the cache store. No-op when caching is disabled.
    pub fn evict(&self, key: &K) {
        if let Some(cache) = &self.inner.cache {
            cache.delete(key);
        }
    }

    /// Remove every key in `keys` from the cache store.
    pub fn evict_many<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
    {
        for key in keys {
            self.evict(key);
        }
    }

    /// Clear the cache store. No-op when caching is disabled.
    pub fn evict_all(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
    }

    /// Put `value` into the cache store so later requests for `key` skip the
    /// fetch. No-op when caching is disabled.
    pub fn prime(&self, key: K, value: F::Value) {
        if let Some(cache) = &self.inner.cache {
            cache.set(key, value);
        }
    }

    /// Prime every `(key, value)` pair.
    pub fn prime_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, F::Value)>,
    {
        for (key, value) in entries {
            self.prime(key, value);
        }
    }
}

impl<K, F> Inner<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    fn lock_state(&self) -> MutexGuard<'_, State<K, F::Value, F::Error>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `key` from the cache, or create the request to queue for it.
    #[allow(clippy::type_complexity)]
    fn admit(
        &self,
        key: K,
    ) -> (
        LoadFuture<F::Value, F::Error>,
        Option<PendingRequest<K, F::Value, F::Error>>,
    ) {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&key) {
                trace!("cache hit");
                metrics::record_request(true);
                return (LoadFuture::ready(value), None);
            }
            metrics::record_request(false);
        }
        let (settle, future) = LoadFuture::channel();
        (future, Some(PendingRequest { key, settle }))
    }

    /// Push `requests` in one critical section, arming the timer if they
    /// open a new batch.
    fn enqueue(self: &Arc<Self>, requests: Vec<PendingRequest<K, F::Value, F::Error>>) {
        if requests.is_empty() {
            return;
        }
        let mut state = self.lock_state();
        let opens_batch = state.queue.is_empty();
        state.queue.extend(requests);
        if opens_batch {
            let elapsed = state.last_flush.elapsed();
            let delay = self.config.interval.saturating_sub(elapsed);
            Self::arm(self, delay);
        }
    }

    /// Spawn the one-shot timer flushing the batch that was just opened.
    fn arm(this: &Arc<Self>, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "armed batch timer");
        let inner = Arc::clone(this);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.flush().await;
        });
    }

    async fn flush(&self) {
        let batch = {
            let mut state = self.lock_state();
            state.last_flush = Instant::now();
            std::mem::take(&mut state.queue)
        };
        if batch.is_empty() {
            return;
        }

        let requests = batch.len();
        let slots = self.slots(batch);
        let span = debug_span!("batch_flush", batch_size = requests, keys = slots.len());
        self.settle(slots).instrument(span).await;
    }

    /// Group the drained queue into fetch slots.
    ///
    /// Without dedupe every request keeps its own slot, duplicates included.
    /// With dedupe each distinct key gets one slot, in first-seen order.
    fn slots(
        &self,
        batch: Vec<PendingRequest<K, F::Value, F::Error>>,
    ) -> Vec<Slot<K, F::Value, F::Error>> {
        if !self.config.dedupe {
            return batch
                .into_iter()
                .map(|request| Slot {
                    key: request.key,
                    waiters: vec![request.settle],
                })
                .collect();
        }

        let mut positions: HashMap<K, usize> = HashMap::with_capacity(batch.len());
        let mut slots: Vec<Slot<K, F::Value, F::Error>> = Vec::new();
        for request in batch {
            match positions.entry(request.key) {
                Entry::Occupied(entry) => slots[*entry.get()].waiters.push(request.settle),
                Entry::Vacant(entry) => {
                    slots.push(Slot {
                        key: entry.key().clone(),
                        waiters: vec![request.settle],
                    });
                    entry.insert(slots.len() - 1);
                }
            }
        }
        slots
    }

    async fn settle(&self, slots: Vec<Slot<K, F::Value, F::Error>>) {
        let keys: Vec<K> = slots.iter().map(|slot| slot.key.clone()).collect();
        let started = Instant::now();
        let fetched = self.fetch.fetch(&keys).await;
        let elapsed = started.elapsed();

        let results = match fetched {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, "batch fetch failed");
                metrics::record_flush(keys.len(), elapsed, FlushOutcome::Failed, 0);
                let err = LoadError::Fetch(Arc::new(err));
                for slot in slots {
                    slot.reject(&err);
                }
                return;
            }
        };

        if results.len() != keys.len() {
            warn!(
                expected = keys.len(),
                actual = results.len(),
                "fetch result length does not match keys"
            );
            metrics::record_flush(keys.len(), elapsed, FlushOutcome::ArityMismatch, 0);
            let err = LoadError::ArityMismatch {
                expected: keys.len(),
                actual: results.len(),
            };
            for slot in slots {
                slot.reject(&err);
            }
            return;
        }

        let mut key_errors = 0;
        for (slot, result) in slots.into_iter().zip(results) {
            match result {
                Ok(value) => {
                    if let Some(cache) = &self.cache {
                        cache.set(slot.key.clone(), value.clone());
                    }
                    slot.resolve(value);
                }
                Err(err) => {
                    key_errors += 1;
                    slot.reject(&LoadError::Key(Arc::new(err)));
                }
            }
        }
        metrics::record_flush(keys.len(), elapsed, FlushOutcome::Completed, key_errors);
        debug!(key_errors, "batch settled");
    }
}

/// Builder for [`BatchScheduler`].
///
/// Use [`BatchScheduler::builder()`] to create a new builder.
pub struct BatchSchedulerBuilder<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    fetch: F,
    config: SchedulerConfig,
    cache: Option<SharedStore<K, F::Value>>,
}

impl<K, F> BatchSchedulerBuilder<K, F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fetch<K>,
{
    /// Creates a builder with the default [`SchedulerConfig`].
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            config: SchedulerConfig::default(),
            cache: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(self, config: SchedulerConfig) -> Self {
        Self { config, ..self }
    }

    /// Sets the batching interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Enables or disables caching of resolved values.
    ///
    /// Requires a [`cache_store`](Self::cache_store).
    pub fn caching(mut self, enabled: bool) -> Self {
        self.config.caching = enabled;
        self
    }

    /// Enables or disables key deduplication within a batch.
    pub fn dedupe(mut self, enabled: bool) -> Self {
        self.config.dedupe = enabled;
        self
    }

    /// Sets the store used when caching is enabled.
    pub fn cache_store<S>(self, store: S) -> Self
    where
        S: CacheStore<K, F::Value>,
    {
        Self {
            cache: Some(Arc::new(store)),
            ..self
        }
    }

    /// Builds the [`BatchScheduler`].
    ///
    /// Fails with [`ConfigError::MissingCacheStore`] when caching is enabled
    /// without a store. A store supplied while caching is disabled is unused.
    pub fn build(self) -> Result<BatchScheduler<K, F>, ConfigError> {
        let cache = match (self.config.caching, self.cache) {
            (true, Some(cache)) => Some(cache),
            (true, None) => return Err(ConfigError::MissingCacheStore),
            (false, _) => None,
        };

        Ok(BatchScheduler {
            inner: Arc::new(Inner {
                fetch: self.fetch,
                config: self.config,
                cache,
                state: Mutex::new(State {
                    queue: Vec::new(),
                    last_flush: Instant::now(),
                }),
            }),
        })
    }
}
