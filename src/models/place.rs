use crate::models::Coordinates;
use serde::{Deserialize, Serialize};

/// A place record as returned by the places service, after normalization.
/// Every optional upstream field stays optional here; the pipeline decides
/// what it requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub id: String,
    pub name: String,
    pub location: Option<Coordinates>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub photo_ref: Option<String>,
    pub maps_url: Option<String>,
    pub address: Option<String>,
    pub primary_type: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl PlaceCandidate {
    pub fn has_display_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Convert into a point of interest. Places without an id, a display
    /// name, or a location cannot be shown and are dropped.
    pub fn into_point_of_interest(self) -> Option<PointOfInterest> {
        if self.id.is_empty() || !self.has_display_name() {
            return None;
        }
        let location = self.location?;

        Some(PointOfInterest {
            id: self.id,
            name: self.name,
            location,
            rating: self.rating,
            rating_count: self.rating_count,
            photo_ref: self.photo_ref,
            maps_url: self.maps_url,
            address: self.address.filter(|a| !a.trim().is_empty()),
            primary_type: self.primary_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Stable external identifier; all grouping and dedup keys on it
    pub id: String,
    pub name: String,
    pub location: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceReview {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub reviews: Vec<PlaceReview>,
    pub photo_ref: Option<String>,
    pub maps_url: Option<String>,
}
