use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub id: String,
    #[serde(rename = "placeId")]
    pub place_id: String,
    #[serde(rename = "startTime")]
    pub start_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

/// One day of a trip's plan. Items come back from the server in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    #[serde(rename = "tripId")]
    pub trip_id: String,
    pub day: u32,
    #[serde(default)]
    pub items: Vec<ItineraryItem>,
}

impl ItineraryDay {
    pub fn place_ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.place_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewItineraryItem {
    #[serde(rename = "placeId")]
    pub place_id: String,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
