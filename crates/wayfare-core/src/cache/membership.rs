use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::entry::CachedData;

struct Answer {
    entry: CachedData<bool>,
    last_used: u64,
}

/// Whether a place belongs to a trip, keyed first by trip id and then by
/// place id. Each (trip, place) answer carries its own timestamp.
///
/// Like [`TtlCache`](super::TtlCache), it keeps an epoch moved by every
/// explicit write and invalidation so a remote check that started earlier
/// can't overwrite a newer answer. An optional capacity counts (trip, place)
/// pairs across all trips.
pub struct MembershipCache {
    trips: HashMap<String, HashMap<String, Answer>>,
    ttl: Duration,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
    tick: u64,
    epoch: u64,
}

impl MembershipCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            trips: HashMap::new(),
            ttl,
            max_entries: None,
            clock: Arc::new(SystemClock),
            tick: 0,
            epoch: 0,
        }
    }

    /// Bound the number of (trip, place) pairs. `None` or zero leaves the
    /// cache unbounded.
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries.filter(|&max| max > 0);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Total (trip, place) entries across all trips.
    pub fn len(&self) -> usize {
        self.trips.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&mut self, trip_id: &str, place_id: &str) -> Option<bool> {
        let now = self.clock.now();
        self.tick += 1;
        let tick = self.tick;
        let places = self.trips.get_mut(trip_id)?;
        let answer = places.get_mut(place_id)?;

        if answer.entry.is_fresh(self.ttl, now) {
            answer.last_used = tick;
            return Some(answer.entry.data);
        }

        places.remove(place_id);
        if places.is_empty() {
            self.trips.remove(trip_id);
        }
        debug!(trip_id, place_id, "Dropped expired membership entry");
        None
    }

    /// Record an answer known from a mutation. Checks already in flight will
    /// not overwrite it.
    pub fn set(&mut self, trip_id: &str, place_id: &str, in_trip: bool) {
        self.bump_epoch();
        self.insert(trip_id, place_id, in_trip);
    }

    /// Store a remote answer only if nothing was written or invalidated
    /// since `epoch` was read. Returns whether it was stored.
    pub fn store_if_current(&mut self, trip_id: &str, place_id: &str, in_trip: bool, epoch: u64) -> bool {
        if self.epoch != epoch {
            debug!(trip_id, place_id, "Discarded membership answer superseded by a later change");
            return false;
        }
        self.insert(trip_id, place_id, in_trip);
        true
    }

    pub fn invalidate(&mut self, trip_id: &str, place_id: &str) -> bool {
        self.bump_epoch();
        let Some(places) = self.trips.get_mut(trip_id) else {
            return false;
        };
        let removed = places.remove(place_id).is_some();
        if places.is_empty() {
            self.trips.remove(trip_id);
        }
        removed
    }

    /// Drop every membership answer for `trip_id` in one step. Other trips
    /// are untouched.
    pub fn invalidate_trip(&mut self, trip_id: &str) -> usize {
        self.bump_epoch();
        self.trips
            .remove(trip_id)
            .map(|places| places.len())
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.bump_epoch();
        self.trips.clear();
    }

    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut removed = 0;
        for places in self.trips.values_mut() {
            let before = places.len();
            places.retain(|_, answer| answer.entry.is_fresh(ttl, now));
            removed += before - places.len();
        }
        self.trips.retain(|_, places| !places.is_empty());
        if removed > 0 {
            debug!(removed, "Swept expired membership entries");
        }
        removed
    }

    fn insert(&mut self, trip_id: &str, place_id: &str, in_trip: bool) {
        if let Some(max) = self.max_entries {
            let present = self
                .trips
                .get(trip_id)
                .is_some_and(|places| places.contains_key(place_id));
            if !present && self.len() >= max {
                self.sweep();
                while self.len() >= max {
                    let Some((trip, place)) = self.least_recently_used() else {
                        break;
                    };
                    self.remove_pair(&trip, &place);
                    debug!(trip_id = %trip, place_id = %place, "Evicted least recently used membership entry");
                }
            }
        }

        let now = self.clock.now();
        self.tick += 1;
        let answer = Answer {
            entry: CachedData::new(in_trip, now),
            last_used: self.tick,
        };
        self.trips
            .entry(trip_id.to_string())
            .or_default()
            .insert(place_id.to_string(), answer);
    }

    fn least_recently_used(&self) -> Option<(String, String)> {
        self.trips
            .iter()
            .flat_map(|(trip, places)| places.iter().map(move |(place, answer)| (trip, place, answer.last_used)))
            .min_by_key(|(_, _, last_used)| *last_used)
            .map(|(trip, place, _)| (trip.clone(), place.clone()))
    }

    /// Removal without moving the epoch; eviction is not a change in what
    /// the server said.
    fn remove_pair(&mut self, trip_id: &str, place_id: &str) {
        if let Some(places) = self.trips.get_mut(trip_id) {
            places.remove(place_id);
            if places.is_empty() {
                self.trips.remove(trip_id);
            }
        }
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}
