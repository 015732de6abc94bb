use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiError, TravelApi};
use crate::cache::CacheRegistry;
use crate::models::{NewTrip, Trip, TripUpdate};

/// Trips and place-in-trip membership.
#[derive(Clone)]
pub struct TripManager {
    api: Arc<dyn TravelApi>,
    caches: Arc<CacheRegistry>,
}

impl TripManager {
    pub fn new(api: Arc<dyn TravelApi>, caches: Arc<CacheRegistry>) -> Self {
        Self { api, caches }
    }

    pub async fn fetch_trip(&self, trip_id: &str, force_refresh: bool) -> Result<Trip, ApiError> {
        self.caches
            .trips
            .fetch(trip_id.to_string(), force_refresh, || self.api.fetch_trip(trip_id))
            .await
    }

    /// The new trip is not cached; its first read fetches it.
    pub async fn create_trip(&self, trip: &NewTrip) -> Result<Trip, ApiError> {
        self.api.create_trip(trip).await
    }

    pub async fn update_trip(&self, trip_id: &str, update: &TripUpdate) -> Result<Trip, ApiError> {
        let trip = self.api.update_trip(trip_id, update).await?;
        self.invalidate_trip(trip_id).await;
        Ok(trip)
    }

    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), ApiError> {
        self.api.delete_trip(trip_id).await?;
        self.invalidate_trip(trip_id).await;
        let days = self
            .caches
            .itineraries
            .invalidate_where(|key| key.trip_id == trip_id)
            .await;
        debug!(trip_id, itinerary_days = days, "Dropped cached itinerary for deleted trip");
        Ok(())
    }

    /// Fetch-through on the membership cache. An answer that arrives after
    /// an add, remove or trip invalidation is returned but not cached.
    pub async fn is_place_in_trip(
        &self,
        trip_id: &str,
        place_id: &str,
        force_refresh: bool,
    ) -> Result<bool, ApiError> {
        let epoch = {
            let mut membership = self.caches.membership.lock().await;
            if !force_refresh {
                if let Some(in_trip) = membership.get(trip_id, place_id) {
                    debug!(trip_id, place_id, "Membership cache hit");
                    return Ok(in_trip);
                }
            }
            membership.epoch()
        };

        let in_trip = self.api.is_place_in_trip(trip_id, place_id).await?;
        self.caches
            .membership
            .lock()
            .await
            .store_if_current(trip_id, place_id, in_trip, epoch);
        Ok(in_trip)
    }

    /// Fails with [`ApiError::AlreadyInTrip`] if the place is already a member.
    pub async fn add_place_to_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        self.api.add_place_to_trip(trip_id, place_id).await?;
        self.record_membership_change(trip_id, place_id, true).await;
        Ok(())
    }

    pub async fn remove_place_from_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        self.api.remove_place_from_trip(trip_id, place_id).await?;
        self.record_membership_change(trip_id, place_id, false).await;
        Ok(())
    }

    /// The membership answer is known from the mutation itself, so it is
    /// stored. The trip's counts and place list are server-computed, so the
    /// trip entry is dropped instead and refetched on its next read.
    async fn record_membership_change(&self, trip_id: &str, place_id: &str, in_trip: bool) {
        self.caches.membership.lock().await.set(trip_id, place_id, in_trip);
        self.caches.trips.invalidate(trip_id).await;
        debug!(trip_id, place_id, in_trip, "Recorded membership change");
    }

    async fn invalidate_trip(&self, trip_id: &str) {
        self.caches.trips.invalidate(trip_id).await;
        let places = self.caches.membership.lock().await.invalidate_trip(trip_id);
        debug!(trip_id, membership_entries = places, "Invalidated trip");
    }
}
