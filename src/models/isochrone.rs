use crate::models::Coordinates;
use geo::Rect;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Axis-aligned extent in GeoJSON order: `[min_lng, min_lat, max_lng, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lng <= other.max_lng
            && other.min_lng <= self.max_lng
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox {
            min_lng: rect.min().x,
            min_lat: rect.min().y,
            max_lng: rect.max().x,
            max_lat: rect.max().y,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(b: [f64; 4]) -> Self {
        BoundingBox {
            min_lng: b[0],
            min_lat: b[1],
            max_lng: b[2],
            max_lat: b[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lng, b.min_lat, b.max_lng, b.max_lat]
    }
}

/// One polygon of the municipality boundary dataset, converted once at load.
#[derive(Debug, Clone)]
pub struct MunicipalityBoundary {
    pub id: String,
    pub name: String,
    pub geometry: geo::Geometry<f64>,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectingMunicipality {
    pub id: String,
    pub name: String,
    pub center: Coordinates,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Serialize)]
pub struct IsochroneResult {
    /// Everywhere reachable within the budget, as GeoJSON
    pub region: FeatureCollection,
    pub municipalities: Vec<IntersectingMunicipality>,
}
