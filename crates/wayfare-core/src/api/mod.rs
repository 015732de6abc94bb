//! REST API client module for the travel backend.
//!
//! This module provides the `TravelApi` trait the managers depend on and
//! `ApiClient`, its reqwest implementation. The backend owns all trip, place
//! and itinerary data; requests carry a bearer token obtained from
//! `POST /auth/login`.

pub mod backend;
pub mod client;
pub mod error;

pub use backend::TravelApi;
pub use client::ApiClient;
pub use error::ApiError;
