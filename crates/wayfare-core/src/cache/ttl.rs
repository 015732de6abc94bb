use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::entry::CachedData;

/// One stored entry plus the access tick used for eviction.
struct Slot<V> {
    entry: CachedData<V>,
    last_used: u64,
}

/// In-memory key/value store where every entry expires a fixed time after it
/// was written.
///
/// Expired entries are never returned: `get` drops them as it finds them and
/// `sweep` drops them in bulk. With a capacity set, inserting a new key into a
/// full cache first sweeps, then evicts the least recently used key.
///
/// The cache also keeps an epoch that moves on every explicit write or
/// invalidation. A fetch that reads the epoch before going remote can store
/// its result with [`TtlCache::store_if_current`], which refuses the write if
/// anything changed the cache's contents in between.
pub struct TtlCache<K, V> {
    name: &'static str,
    entries: HashMap<K, Slot<V>>,
    ttl: Duration,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
    /// Bumped by `get` and `set`; the smallest `last_used` is evicted first.
    tick: u64,
    epoch: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            ttl,
            max_entries: None,
            clock: Arc::new(SystemClock),
            tick: 0,
            epoch: 0,
        }
    }

    /// Bound the number of entries. `None` or zero leaves the cache unbounded.
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries.filter(|&max| max > 0);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current write epoch; see [`TtlCache::store_if_current`].
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of stored entries, including any not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the value for `key` if it is still fresh. A stale entry is
    /// removed.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let fresh = self.entries.get(key)?.entry.is_fresh(self.ttl, now);

        if !fresh {
            if let Some((stale_key, _)) = self.entries.remove_entry(key) {
                debug!(cache = self.name, key = ?stale_key, "Dropped expired entry");
            }
            return None;
        }

        let tick = self.next_tick();
        let slot = self.entries.get_mut(key)?;
        slot.last_used = tick;
        Some(slot.entry.data.clone())
    }

    /// Store `value` under `key` with the current time, replacing any prior
    /// entry and its timestamp. Fetches already in flight will not overwrite
    /// this value.
    pub fn set(&mut self, key: K, value: V) {
        self.bump_epoch();
        self.insert(key, value);
    }

    /// Store a fetched value only if the epoch is still `epoch`, i.e. nothing
    /// was written or invalidated since the fetch started. Returns whether
    /// the value was stored.
    pub fn store_if_current(&mut self, key: K, value: V, epoch: u64) -> bool {
        if self.epoch != epoch {
            debug!(cache = self.name, key = ?key, "Discarded fetch result superseded by a later change");
            return false;
        }
        self.insert(key, value);
        true
    }

    /// Remove `key` whether or not it is fresh.
    pub fn invalidate<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // A fetch for `key` may be in flight even when nothing is stored yet
        self.bump_epoch();
        self.entries.remove(key).is_some()
    }

    /// Remove every entry whose key matches `predicate`. Returns the number
    /// removed.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        self.bump_epoch();
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.bump_epoch();
        self.entries.clear();
    }

    /// Drop every expired entry. Returns the number dropped.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.entry.is_fresh(ttl, now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(cache = self.name, removed, "Swept expired entries");
        }
        removed
    }

    /// When `key` was last written, if it is still fresh.
    pub fn cached_at<Q>(&self, key: &Q) -> Option<DateTime<Utc>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.fresh_entry(key).map(|entry| entry.cached_at)
    }

    pub fn age_display<Q>(&self, key: &Q) -> Option<String>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.fresh_entry(key).map(|entry| entry.age_display(now))
    }

    fn fresh_entry<Q>(&self, key: &Q) -> Option<&CachedData<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|slot| &slot.entry)
            .filter(|entry| entry.is_fresh(self.ttl, now))
    }

    fn insert(&mut self, key: K, value: V) {
        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.sweep();
                while self.entries.len() >= max {
                    let Some(evicted) = self.least_recently_used() else {
                        break;
                    };
                    self.entries.remove(&evicted);
                    debug!(cache = self.name, key = ?evicted, "Evicted least recently used entry");
                }
            }
        }

        let now = self.clock.now();
        let last_used = self.next_tick();
        self.entries.insert(
            key,
            Slot {
                entry: CachedData::new(value, now),
                last_used,
            },
        );
    }

    fn least_recently_used(&self) -> Option<K> {
        self.entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone())
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}
