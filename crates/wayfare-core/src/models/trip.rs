use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub destination: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "placeIds", default)]
    pub place_ids: Vec<String>,
    /// Server-computed; may lag `place_ids` on older API versions.
    #[serde(rename = "placeCount", default)]
    pub place_count: u32,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// Number of days covered, counting both ends. `None` without both dates
    /// or when the end is before the start.
    pub fn duration_days(&self) -> Option<u32> {
        let (start, end) = (self.start_date?, self.end_date?);
        let days = (end - start).num_days();
        if days < 0 {
            None
        } else {
            u32::try_from(days + 1).ok()
        }
    }

    pub fn contains_place(&self, place_id: &str) -> bool {
        self.place_ids.iter().any(|id| id == place_id)
    }
}

/// Body for creating a trip.
#[derive(Debug, Clone, Serialize)]
pub struct NewTrip {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Partial update; unset fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TripUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl TripUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.destination.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}
