//! Data models for wayfare entities.
//!
//! This module contains the data structures exchanged with the travel API:
//!
//! - `Trip`, `NewTrip`, `TripUpdate`: trips and the bodies used to change them
//! - `PlaceDetail`, `PlaceBasic`, `Tag`: places at two levels of detail plus tags
//! - `ItineraryDay`, `ItineraryItem`, `NewItineraryItem`: per-day plans

pub mod itinerary;
pub mod place;
pub mod trip;

pub use itinerary::{ItineraryDay, ItineraryItem, NewItineraryItem};
pub use place::{Coordinates, OpeningHours, PlaceBasic, PlaceDetail, Tag};
pub use trip::{NewTrip, Trip, TripUpdate};
