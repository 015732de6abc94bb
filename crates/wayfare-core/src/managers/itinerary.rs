use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiError, TravelApi};
use crate::cache::{CacheRegistry, ItineraryKey};
use crate::models::{ItineraryDay, ItineraryItem, NewItineraryItem};

#[derive(Clone)]
pub struct ItineraryManager {
    api: Arc<dyn TravelApi>,
    caches: Arc<CacheRegistry>,
}

impl ItineraryManager {
    pub fn new(api: Arc<dyn TravelApi>, caches: Arc<CacheRegistry>) -> Self {
        Self { api, caches }
    }

    pub async fn fetch_day(
        &self,
        trip_id: &str,
        day: u32,
        force_refresh: bool,
    ) -> Result<ItineraryDay, ApiError> {
        self.caches
            .itineraries
            .fetch(ItineraryKey::new(trip_id, day), force_refresh, || {
                self.api.fetch_itinerary_day(trip_id, day)
            })
            .await
    }

    /// Adding an item can reorder other days server-side, so every cached
    /// day of the trip is dropped, not just `day`.
    pub async fn add_item(
        &self,
        trip_id: &str,
        day: u32,
        item: &NewItineraryItem,
    ) -> Result<ItineraryItem, ApiError> {
        let created = self.api.add_itinerary_item(trip_id, day, item).await?;
        let dropped = self
            .caches
            .itineraries
            .invalidate_where(|key| key.trip_id == trip_id)
            .await;
        debug!(trip_id, day, dropped, "Invalidated itinerary after adding item");
        Ok(created)
    }
}
