//! Place models at two levels of detail.
//!
//! `PlaceBasic` is the lightweight card shown in lists; `PlaceDetail` is the
//! full record for a place's own page. They are fetched and cached separately.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for distance estimates.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    /// 0 = Monday.
    pub weekday: u8,
    pub open: String,
    pub close: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceBasic {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetail {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(rename = "photoUrls", default)]
    pub photo_urls: Vec<String>,
    #[serde(rename = "openingHours", default)]
    pub opening_hours: Vec<OpeningHours>,
}

impl PlaceDetail {
    pub fn to_basic(&self) -> PlaceBasic {
        PlaceBasic {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            thumbnail_url: self.photo_urls.first().cloned(),
        }
    }

    pub fn display_rating(&self) -> String {
        match self.rating {
            Some(rating) => format!("{:.1}", rating),
            None => "Unrated".to_string(),
        }
    }
}
