use std::borrow::Borrow;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::Mutex;
use tracing::debug;

use super::ttl::TtlCache;

/// A [`TtlCache`] that sits in front of a remote fetch.
///
/// The cache lives behind its own mutex, so every read and write on one
/// instance is serialized. The lock is never held while the remote call is
/// in flight: a miss notes the cache epoch, releases the lock, awaits the
/// fetch, then re-locks to store. A fetch that fails or is dropped before
/// completing never reaches the store step, and one that completes after an
/// invalidation or explicit write is returned to its caller but not stored.
pub struct FetchThroughCache<K, V> {
    inner: Mutex<TtlCache<K, V>>,
}

impl<K, V> FetchThroughCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(cache: TtlCache<K, V>) -> Self {
        Self {
            inner: Mutex::new(cache),
        }
    }

    /// Serve `key` from cache when fresh, otherwise call `remote` and store
    /// its result. `force_refresh` skips the cache read but still stores.
    /// Errors pass through untouched and leave the cache as it was.
    ///
    /// If the cache is invalidated or written while `remote` is running, the
    /// fetched value predates that change and is not stored.
    pub async fn fetch<F, Fut, E>(&self, key: K, force_refresh: bool, remote: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let epoch = {
            let mut cache = self.inner.lock().await;
            if !force_refresh {
                if let Some(value) = cache.get(&key) {
                    debug!(cache = cache.name(), key = ?key, "Cache hit");
                    return Ok(value);
                }
                debug!(cache = cache.name(), key = ?key, "Cache miss");
            }
            cache.epoch()
        };

        let value = remote().await?;

        self.inner
            .lock()
            .await
            .store_if_current(key, value.clone(), epoch);
        Ok(value)
    }

    /// The fresh cached value for `key`, without fetching.
    pub async fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.get(key)
    }

    pub async fn set(&self, key: K, value: V) {
        self.inner.lock().await.set(key, value);
    }

    pub async fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.lock().await;
        let removed = cache.invalidate(key);
        if removed {
            debug!(cache = cache.name(), "Invalidated entry");
        }
        removed
    }

    pub async fn invalidate_where(&self, predicate: impl FnMut(&K) -> bool) -> usize {
        self.inner.lock().await.invalidate_where(predicate)
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub async fn sweep(&self) -> usize {
        self.inner.lock().await.sweep()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub async fn age_display<Q>(&self, key: &Q) -> Option<String>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.age_display(key)
    }
}
