use crate::error::{AppError, Result};
use crate::models::{Budget, Coordinates};
use crate::services::flexpolyline;
use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Position, Value};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const HERE_ISOLINE_BASE_URL: &str = "https://isoline.router.hereapi.com/v8/isolines";
const SERVICE: &str = "Isoline";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolineRange {
    Time { seconds: u32 },
    Distance { meters: u32 },
}

impl From<&Budget> for IsolineRange {
    fn from(budget: &Budget) -> Self {
        match *budget {
            Budget::Time { minutes } => IsolineRange::Time {
                seconds: (minutes * 60.0).round() as u32,
            },
            Budget::Distance { km } => IsolineRange::Distance {
                meters: (km * 1000.0).round() as u32,
            },
        }
    }
}

impl IsolineRange {
    fn range_type(&self) -> &'static str {
        match self {
            IsolineRange::Time { .. } => "time",
            IsolineRange::Distance { .. } => "distance",
        }
    }

    fn range_value(&self) -> u32 {
        match *self {
            IsolineRange::Time { seconds } => seconds,
            IsolineRange::Distance { meters } => meters,
        }
    }
}

/// Reachable-area polygon for one origin and range. The payload is returned
/// as-is; see [`to_feature_collection`] for normalization.
#[async_trait]
pub trait IsolineClient: Send + Sync {
    async fn isoline(&self, origin: &Coordinates, range: IsolineRange) -> Result<serde_json::Value>;
}

/// HERE Isoline Routing API v8 client (car).
#[derive(Clone)]
pub struct HereIsolineClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl HereIsolineClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(api_key, HERE_ISOLINE_BASE_URL.to_string())
    }

    pub fn with_config(api_key: String, base_url: String) -> Self {
        HereIsolineClient {
            client: Client::new(),
            api_key,
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl IsolineClient for HereIsolineClient {
    async fn isoline(
        &self,
        origin: &Coordinates,
        range: IsolineRange,
    ) -> Result<serde_json::Value> {
        let origin_str = format!("{},{}", origin.lat, origin.lng);
        let range_value = range.range_value().to_string();

        tracing::debug!(
            range_type = range.range_type(),
            range_value = range.range_value(),
            "Isoline request: ({:.4}, {:.4}) {} {}",
            origin.lat,
            origin.lng,
            range.range_type(),
            range.range_value()
        );

        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .query(&[
                ("transportMode", "car"),
                ("origin", origin_str.as_str()),
                ("range[type]", range.range_type()),
                ("range[values]", range_value.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, "Isoline HTTP error {}: {}", status, error_text);
            return Err(AppError::upstream_status(
                SERVICE,
                status.as_u16(),
                error_text,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Failed to parse response: {}", e)))
    }
}

// HERE isoline payload

#[derive(Debug, Deserialize)]
struct HereResponse {
    #[serde(default)]
    isolines: Vec<HereIsoline>,
}

#[derive(Debug, Deserialize)]
struct HereIsoline {
    #[serde(default)]
    range: Option<HereRange>,
    #[serde(default)]
    polygons: Vec<HerePolygon>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HereRange {
    Object { value: f64 },
    Number(f64),
}

#[derive(Debug, Deserialize)]
struct HerePolygon {
    outer: Option<HereRing>,
    #[serde(default)]
    inner: Vec<HereRing>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HereRing {
    /// Flexible polyline, `(lat, lng)` order
    Encoded(String),
    /// `[lng, lat]` positions
    Positions(Vec<Position>),
    Geometry { coordinates: Vec<Position> },
}

impl HereRing {
    fn into_positions(self) -> Option<Vec<Position>> {
        let positions = match self {
            HereRing::Encoded(encoded) => match flexpolyline::decode(&encoded) {
                Ok(points) => points.into_iter().map(|(lat, lng)| vec![lng, lat]).collect(),
                Err(e) => {
                    tracing::warn!("Skipping undecodable isoline ring: {}", e);
                    return None;
                }
            },
            HereRing::Positions(positions) | HereRing::Geometry { coordinates: positions } => {
                positions
            }
        };

        if positions.iter().any(|p| p.len() < 2) {
            return None;
        }
        Some(positions)
    }
}

/// Append the first position when the ring does not already end on it.
pub fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first.len() >= 2 && last.len() >= 2 && (first[0] != last[0] || first[1] != last[1]) {
            let first = first.clone();
            ring.push(first);
        }
    }
    ring
}

fn polygon_feature(rings: Vec<Vec<Position>>, range: Option<f64>) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(range) = range {
        properties.insert("range".to_string(), serde_json::json!(range));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(rings))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn from_here(raw: HereResponse) -> FeatureCollection {
    let mut features = Vec::new();

    for isoline in raw.isolines {
        let range = isoline.range.map(|r| match r {
            HereRange::Object { value } | HereRange::Number(value) => value,
        });

        for polygon in isoline.polygons {
            let Some(outer) = polygon.outer.and_then(HereRing::into_positions) else {
                continue;
            };

            let mut rings = vec![close_ring(outer)];
            rings.extend(
                polygon
                    .inner
                    .into_iter()
                    .filter_map(HereRing::into_positions)
                    .map(close_ring),
            );

            features.push(polygon_feature(rings, range));
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn single_feature(feature: Feature) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    }
}

/// Normalize an isoline payload into a FeatureCollection.
///
/// A FeatureCollection passes through unchanged, a bare Feature or Geometry
/// is wrapped, and a HERE `isolines[].polygons[]` payload is converted into
/// one Polygon feature per outer ring (holes attached) with the numeric
/// range stored in the `range` property. Anything else yields an empty
/// collection.
pub fn to_feature_collection(raw: &serde_json::Value) -> Result<FeatureCollection> {
    if raw.get("type").is_some() {
        let geojson: GeoJson = serde_json::from_value(raw.clone()).map_err(|e| {
            AppError::upstream(SERVICE, format!("Malformed GeoJSON payload: {}", e))
        })?;

        return Ok(match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => single_feature(feature),
            GeoJson::Geometry(geometry) => single_feature(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }),
        });
    }

    if raw.get("isolines").is_some() {
        let here: HereResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            AppError::upstream(SERVICE, format!("Malformed isoline payload: {}", e))
        })?;
        return Ok(from_here(here));
    }

    tracing::warn!("Unrecognized isoline payload, treating as empty region");
    Ok(FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    })
}
