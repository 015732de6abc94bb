use async_trait::async_trait;

use crate::auth::SessionData;
use crate::models::{
    ItineraryDay, ItineraryItem, NewItineraryItem, NewTrip, PlaceBasic, PlaceDetail, Tag, Trip,
    TripUpdate,
};

use super::ApiError;

/// The remote travel API as seen by the managers.
///
/// `ApiClient` is the HTTP implementation; tests substitute an in-memory one.
#[async_trait]
pub trait TravelApi: Send + Sync {
    /// Install or drop the bearer token used on later requests.
    fn set_token(&self, token: Option<String>);

    async fn authenticate(&self, username: &str, password: &str) -> Result<SessionData, ApiError>;

    async fn fetch_trip(&self, trip_id: &str) -> Result<Trip, ApiError>;
    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip, ApiError>;
    async fn update_trip(&self, trip_id: &str, update: &TripUpdate) -> Result<Trip, ApiError>;
    async fn delete_trip(&self, trip_id: &str) -> Result<(), ApiError>;

    async fn fetch_place_detail(&self, place_id: &str) -> Result<PlaceDetail, ApiError>;
    async fn fetch_place_basic(&self, place_id: &str) -> Result<PlaceBasic, ApiError>;
    async fn fetch_tags(&self, tag_type: &str) -> Result<Vec<Tag>, ApiError>;

    async fn fetch_itinerary_day(&self, trip_id: &str, day: u32) -> Result<ItineraryDay, ApiError>;
    async fn add_itinerary_item(
        &self,
        trip_id: &str,
        day: u32,
        item: &NewItineraryItem,
    ) -> Result<ItineraryItem, ApiError>;

    async fn is_place_in_trip(&self, trip_id: &str, place_id: &str) -> Result<bool, ApiError>;
    /// Fails with [`ApiError::AlreadyInTrip`] when the place is already there.
    async fn add_place_to_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError>;
    async fn remove_place_from_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError>;
}
