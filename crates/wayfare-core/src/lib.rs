//! Wayfare core library.
//!
//! This crate holds everything behind the travel planner's screens:
//! the HTTP client for the travel API, the data models it returns, the
//! per-resource TTL caches in front of it, and the managers that combine the
//! two and keep the caches consistent after mutations.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod managers;
pub mod models;
pub mod planner;

pub use api::{ApiClient, ApiError, TravelApi};
pub use cache::{CacheRegistry, CacheSettings};
pub use config::Config;
pub use planner::Planner;
