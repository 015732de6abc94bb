use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::api::{ApiError, TravelApi};
use crate::cache::CacheRegistry;
use crate::models::{PlaceBasic, PlaceDetail, Tag};

/// Maximum concurrent place requests when filling a list of cards.
/// Keeps a long trip from flooding the API with one request per place.
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Place details, place cards and tag lists.
#[derive(Clone)]
pub struct PlaceManager {
    api: Arc<dyn TravelApi>,
    caches: Arc<CacheRegistry>,
}

impl PlaceManager {
    pub fn new(api: Arc<dyn TravelApi>, caches: Arc<CacheRegistry>) -> Self {
        Self { api, caches }
    }

    pub async fn fetch_place_detail(
        &self,
        place_id: &str,
        force_refresh: bool,
    ) -> Result<PlaceDetail, ApiError> {
        self.caches
            .place_details
            .fetch(place_id.to_string(), force_refresh, || {
                self.api.fetch_place_detail(place_id)
            })
            .await
    }

    pub async fn fetch_place_basic(
        &self,
        place_id: &str,
        force_refresh: bool,
    ) -> Result<PlaceBasic, ApiError> {
        self.caches
            .place_basics
            .fetch(place_id.to_string(), force_refresh, || {
                self.api.fetch_place_basic(place_id)
            })
            .await
    }

    /// Cards for several places, in the order given. Cached cards are served
    /// directly; misses are fetched concurrently. The first failure is
    /// returned, while cards fetched before it stay cached.
    pub async fn fetch_place_basics(
        &self,
        place_ids: &[String],
        force_refresh: bool,
    ) -> Result<Vec<PlaceBasic>, ApiError> {
        stream::iter(place_ids)
            .map(|place_id| self.fetch_place_basic(place_id, force_refresh))
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }

    /// Tags of one type, e.g. `"cuisine"` or `"activity"`.
    pub async fn fetch_tags(&self, tag_type: &str, force_refresh: bool) -> Result<Vec<Tag>, ApiError> {
        self.caches
            .tags
            .fetch(tag_type.to_string(), force_refresh, || self.api.fetch_tags(tag_type))
            .await
    }
}
