//! In-memory caching for API reads.
//!
//! This module provides one generic time-to-live cache ([`TtlCache`]) and the
//! pieces built on it:
//! - [`FetchThroughCache`]: serves fresh values and fetches on a miss
//! - [`MembershipCache`]: place-in-trip answers keyed by trip then place
//! - [`CacheRegistry`]: one instance per resource type, shared by the managers
//!
//! Nothing here is persisted. Entries expire after a fixed per-resource TTL
//! and are dropped explicitly after a mutation touches them.

pub mod clock;
pub mod entry;
pub mod fetcher;
pub mod membership;
pub mod registry;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CachedData;
pub use fetcher::FetchThroughCache;
pub use membership::MembershipCache;
pub use registry::{CacheRegistry, CacheSettings, ItineraryKey};
pub use ttl::TtlCache;
