//! In-memory stand-in for the travel API that counts every remote call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use wayfare_core::auth::{Session, SessionData};
use wayfare_core::cache::{CacheRegistry, CacheSettings, ManualClock};
use wayfare_core::models::{
    ItineraryDay, ItineraryItem, NewItineraryItem, NewTrip, PlaceBasic, PlaceDetail, Tag, Trip,
    TripUpdate,
};
use wayfare_core::{ApiError, Planner, TravelApi};

/// Holds the next trip or membership read after its answer is computed:
/// `started` fires once the answer is fixed, and the read returns after
/// `release`.
#[derive(Clone, Default)]
pub struct ReadGate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ReadGate {
    async fn hold(&self) {
        self.started.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
pub struct FakeApi {
    trips: Mutex<HashMap<String, Trip>>,
    memberships: Mutex<HashSet<(String, String)>>,
    itinerary: Mutex<HashMap<(String, u32), Vec<ItineraryItem>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail_next: Mutex<Option<ApiError>>,
    token: Mutex<Option<String>>,
    hang_trip_fetches: AtomicBool,
    read_gate: Mutex<Option<ReadGate>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_trip(self: Arc<Self>, id: &str, name: &str) -> Arc<Self> {
        self.trips.lock().unwrap().insert(id.to_string(), trip(id, name));
        self
    }

    pub fn rename_trip(&self, id: &str, name: &str) {
        if let Some(trip) = self.trips.lock().unwrap().get_mut(id) {
            trip.name = name.to_string();
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn hang_trip_fetches(&self, hang: bool) {
        self.hang_trip_fetches.store(hang, Ordering::SeqCst);
    }

    pub fn gate_next_read(&self) -> ReadGate {
        let gate = ReadGate::default();
        *self.read_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn pass_gate(&self) {
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.hold().await;
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::NotFound(what.to_string())
    }
}

pub fn trip(id: &str, name: &str) -> Trip {
    Trip {
        id: id.to_string(),
        name: name.to_string(),
        destination: None,
        start_date: None,
        end_date: None,
        place_ids: Vec::new(),
        place_count: 0,
        updated_at: None,
    }
}

#[async_trait]
impl TravelApi for FakeApi {
    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<SessionData, ApiError> {
        self.record("authenticate")?;
        if password != "secret" {
            return Err(ApiError::Unauthorized);
        }
        Ok(SessionData {
            token: format!("token-for-{}", username),
            user_id: "U1".to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn fetch_trip(&self, trip_id: &str) -> Result<Trip, ApiError> {
        self.record("fetch_trip")?;
        if self.hang_trip_fetches.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let trip = self
            .trips
            .lock()
            .unwrap()
            .get(trip_id)
            .cloned()
            .ok_or_else(|| Self::not_found(trip_id));
        self.pass_gate().await;
        trip
    }

    async fn create_trip(&self, new_trip: &NewTrip) -> Result<Trip, ApiError> {
        self.record("create_trip")?;
        let mut trips = self.trips.lock().unwrap();
        let id = format!("T{}", trips.len() + 100);
        let created = trip(&id, &new_trip.name);
        trips.insert(id, created.clone());
        Ok(created)
    }

    async fn update_trip(&self, trip_id: &str, update: &TripUpdate) -> Result<Trip, ApiError> {
        self.record("update_trip")?;
        let mut trips = self.trips.lock().unwrap();
        let trip = trips.get_mut(trip_id).ok_or_else(|| Self::not_found(trip_id))?;
        if let Some(ref name) = update.name {
            trip.name = name.clone();
        }
        if let Some(ref destination) = update.destination {
            trip.destination = Some(destination.clone());
        }
        Ok(trip.clone())
    }

    async fn delete_trip(&self, trip_id: &str) -> Result<(), ApiError> {
        self.record("delete_trip")?;
        self.trips
            .lock()
            .unwrap()
            .remove(trip_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(trip_id))
    }

    async fn fetch_place_detail(&self, place_id: &str) -> Result<PlaceDetail, ApiError> {
        self.record("fetch_place_detail")?;
        Ok(PlaceDetail {
            id: place_id.to_string(),
            name: format!("Place {}", place_id),
            description: None,
            address: None,
            category: Some("sight".to_string()),
            coordinates: None,
            rating: None,
            tags: Vec::new(),
            photo_urls: Vec::new(),
            opening_hours: Vec::new(),
        })
    }

    async fn fetch_place_basic(&self, place_id: &str) -> Result<PlaceBasic, ApiError> {
        self.record("fetch_place_basic")?;
        Ok(PlaceBasic {
            id: place_id.to_string(),
            name: format!("Place {}", place_id),
            category: None,
            thumbnail_url: None,
        })
    }

    async fn fetch_tags(&self, tag_type: &str) -> Result<Vec<Tag>, ApiError> {
        self.record("fetch_tags")?;
        Ok(vec![Tag {
            id: format!("{}-1", tag_type),
            name: format!("{} tag", tag_type),
            tag_type: tag_type.to_string(),
        }])
    }

    async fn fetch_itinerary_day(&self, trip_id: &str, day: u32) -> Result<ItineraryDay, ApiError> {
        self.record("fetch_itinerary_day")?;
        let items = self
            .itinerary
            .lock()
            .unwrap()
            .get(&(trip_id.to_string(), day))
            .cloned()
            .unwrap_or_default();
        Ok(ItineraryDay {
            trip_id: trip_id.to_string(),
            day,
            items,
        })
    }

    async fn add_itinerary_item(
        &self,
        trip_id: &str,
        day: u32,
        item: &NewItineraryItem,
    ) -> Result<ItineraryItem, ApiError> {
        self.record("add_itinerary_item")?;
        let mut itinerary = self.itinerary.lock().unwrap();
        let items = itinerary.entry((trip_id.to_string(), day)).or_default();
        let created = ItineraryItem {
            id: format!("I{}", items.len() + 1),
            place_id: item.place_id.clone(),
            start_time: item.start_time,
            notes: item.notes.clone(),
        };
        items.push(created.clone());
        Ok(created)
    }

    async fn is_place_in_trip(&self, trip_id: &str, place_id: &str) -> Result<bool, ApiError> {
        self.record("is_place_in_trip")?;
        let in_trip = self
            .memberships
            .lock()
            .unwrap()
            .contains(&(trip_id.to_string(), place_id.to_string()));
        self.pass_gate().await;
        Ok(in_trip)
    }

    async fn add_place_to_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        self.record("add_place_to_trip")?;
        let inserted = self
            .memberships
            .lock()
            .unwrap()
            .insert((trip_id.to_string(), place_id.to_string()));
        if !inserted {
            return Err(ApiError::AlreadyInTrip {
                trip_id: trip_id.to_string(),
                place_id: place_id.to_string(),
            });
        }
        if let Some(trip) = self.trips.lock().unwrap().get_mut(trip_id) {
            trip.place_ids.push(place_id.to_string());
            trip.place_count += 1;
        }
        Ok(())
    }

    async fn remove_place_from_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        self.record("remove_place_from_trip")?;
        self.memberships
            .lock()
            .unwrap()
            .remove(&(trip_id.to_string(), place_id.to_string()));
        if let Some(trip) = self.trips.lock().unwrap().get_mut(trip_id) {
            trip.place_ids.retain(|id| id != place_id);
            trip.place_count = trip.place_ids.len() as u32;
        }
        Ok(())
    }
}

/// A planner over `api` whose caches read time from the returned clock.
pub fn planner(api: &Arc<FakeApi>) -> (Planner, ManualClock) {
    planner_with_capacity(api, None)
}

pub fn planner_with_capacity(api: &Arc<FakeApi>, max_entries: Option<usize>) -> (Planner, ManualClock) {
    let clock = ManualClock::default();
    let settings = CacheSettings::default()
        .with_clock(Arc::new(clock.clone()))
        .with_max_entries(max_entries);
    let caches = Arc::new(CacheRegistry::new(&settings));
    let session_dir = std::env::temp_dir().join(format!(
        "wayfare-test-{}-{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    let api: Arc<dyn TravelApi> = api.clone();
    (Planner::new(api, caches, Session::new(session_dir)), clock)
}

static NEXT_DIR: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
