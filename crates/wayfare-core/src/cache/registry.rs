use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::{ItineraryDay, PlaceBasic, PlaceDetail, Tag, Trip};

use super::clock::{Clock, SystemClock};
use super::fetcher::FetchThroughCache;
use super::membership::MembershipCache;
use super::ttl::TtlCache;

/// Trips change when the user edits them; five minutes covers edits from
/// other devices without refetching on every screen.
pub const TRIP_TTL_SECS: i64 = 300;
pub const PLACE_DETAIL_TTL_SECS: i64 = 300;
pub const PLACE_BASIC_TTL_SECS: i64 = 300;
pub const TAGS_TTL_SECS: i64 = 300;
pub const ITINERARY_TTL_SECS: i64 = 300;
/// Membership flips whenever a place is added or removed, so it is kept shorter.
pub const MEMBERSHIP_TTL_SECS: i64 = 120;

/// Itinerary days are cached per (trip, day).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItineraryKey {
    pub trip_id: String,
    pub day: u32,
}

impl ItineraryKey {
    pub fn new(trip_id: &str, day: u32) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            day,
        }
    }
}

/// Knobs shared by every cache in a registry.
#[derive(Clone)]
pub struct CacheSettings {
    /// Per-cache entry limit; `None` leaves caches bounded only by TTL. The
    /// membership cache counts (trip, place) pairs against it.
    pub max_entries: Option<usize>,
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl CacheSettings {
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn ttl_cache<K, V>(&self, name: &'static str, ttl_secs: i64) -> TtlCache<K, V>
    where
        K: Eq + std::hash::Hash + Clone + std::fmt::Debug,
        V: Clone,
    {
        TtlCache::new(name, Duration::seconds(ttl_secs))
            .with_max_entries(self.max_entries)
            .with_clock(self.clock.clone())
    }
}

/// One cache per resource type. Built once per client context and handed to
/// the managers; no two resource types share an instance.
pub struct CacheRegistry {
    pub trips: FetchThroughCache<String, Trip>,
    pub place_details: FetchThroughCache<String, PlaceDetail>,
    pub place_basics: FetchThroughCache<String, PlaceBasic>,
    /// Keyed by tag type name.
    pub tags: FetchThroughCache<String, Vec<Tag>>,
    pub itineraries: FetchThroughCache<ItineraryKey, ItineraryDay>,
    pub membership: Mutex<MembershipCache>,
}

impl CacheRegistry {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            trips: FetchThroughCache::new(settings.ttl_cache("trips", TRIP_TTL_SECS)),
            place_details: FetchThroughCache::new(
                settings.ttl_cache("place_details", PLACE_DETAIL_TTL_SECS),
            ),
            place_basics: FetchThroughCache::new(
                settings.ttl_cache("place_basics", PLACE_BASIC_TTL_SECS),
            ),
            tags: FetchThroughCache::new(settings.ttl_cache("tags", TAGS_TTL_SECS)),
            itineraries: FetchThroughCache::new(
                settings.ttl_cache("itineraries", ITINERARY_TTL_SECS),
            ),
            membership: Mutex::new(
                MembershipCache::new(Duration::seconds(MEMBERSHIP_TTL_SECS))
                    .with_max_entries(settings.max_entries)
                    .with_clock(settings.clock.clone()),
            ),
        }
    }

    /// Empty every cache. Used on sign-out and full refresh.
    pub async fn clear_all(&self) {
        self.trips.clear().await;
        self.place_details.clear().await;
        self.place_basics.clear().await;
        self.tags.clear().await;
        self.itineraries.clear().await;
        self.membership.lock().await.clear();
        debug!("Cleared all caches");
    }

    /// Drop expired entries everywhere. Returns the total dropped.
    pub async fn sweep_all(&self) -> usize {
        let removed = self.trips.sweep().await
            + self.place_details.sweep().await
            + self.place_basics.sweep().await
            + self.tags.sweep().await
            + self.itineraries.sweep().await
            + self.membership.lock().await.sweep();
        debug!(removed, "Swept all caches");
        removed
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}
