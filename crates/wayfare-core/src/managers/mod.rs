//! Resource managers: a cache and the remote API composed per resource.
//!
//! Reads go through the resource's cache. Mutations call the API first and,
//! only once it succeeds, drop the cache entries they affect so the next read
//! comes back from the server.

pub mod itinerary;
pub mod place;
pub mod trip;

pub use itinerary::ItineraryManager;
pub use place::PlaceManager;
pub use trip::TripManager;
