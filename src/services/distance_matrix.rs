use crate::constants::DISTANCE_MATRIX_MAX_DESTINATIONS;
use crate::error::{AppError, Result};
use crate::models::Coordinates;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const DISTANCE_MATRIX_BASE_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";
const SERVICE: &str = "Distance Matrix";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Coordinates(Coordinates),
    PlaceId(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Coordinates(c) => write!(f, "{},{}", c.lat, c.lng),
            Destination::PlaceId(id) => write!(f, "place_id:{}", id),
        }
    }
}

/// One origin→destination result. Only `OK` elements carry metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteElement {
    pub status: String,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
}

impl RouteElement {
    pub fn ok(duration_seconds: f64, distance_meters: f64) -> Self {
        RouteElement {
            status: "OK".to_string(),
            duration_seconds: Some(duration_seconds),
            distance_meters: Some(distance_meters),
        }
    }

    pub fn failed(status: &str) -> Self {
        RouteElement {
            status: status.to_string(),
            duration_seconds: None,
            distance_meters: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }

    pub fn duration_minutes(&self) -> Option<f64> {
        self.duration_seconds.map(|s| s / 60.0)
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.distance_meters.map(|m| m / 1000.0)
    }
}

/// Driving cost from one origin to a batch of destinations.
#[async_trait]
pub trait RoutingClient: Send + Sync {
    /// Returns one element per destination, in destination order.
    /// Batches above the upstream limit are rejected; callers chunk.
    async fn distance_matrix(
        &self,
        origin: &Coordinates,
        destinations: &[Destination],
    ) -> Result<Vec<RouteElement>>;
}

#[derive(Clone)]
pub struct GoogleDistanceMatrixClient {
    client: Client,
    api_key: String,
    base_url: String,
    language_code: String,
    timeout: Duration,
}

impl GoogleDistanceMatrixClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            api_key,
            DISTANCE_MATRIX_BASE_URL.to_string(),
            "ja".to_string(),
        )
    }

    pub fn with_config(api_key: String, base_url: String, language_code: String) -> Self {
        GoogleDistanceMatrixClient {
            client: Client::new(),
            api_key,
            base_url,
            language_code,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RoutingClient for GoogleDistanceMatrixClient {
    async fn distance_matrix(
        &self,
        origin: &Coordinates,
        destinations: &[Destination],
    ) -> Result<Vec<RouteElement>> {
        if destinations.len() > DISTANCE_MATRIX_MAX_DESTINATIONS {
            return Err(AppError::InvalidRequest(format!(
                "Maximum {} destinations allowed per distance matrix call",
                DISTANCE_MATRIX_MAX_DESTINATIONS
            )));
        }
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        let origins = format!("{},{}", origin.lat, origin.lng);
        let destinations_str = destinations
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("|");

        tracing::debug!(
            destinations = destinations.len(),
            "Distance matrix request: origin ({:.4}, {:.4}), {} destinations",
            origin.lat,
            origin.lng,
            destinations.len()
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations_str.as_str()),
                ("mode", "driving"),
                ("language", self.language_code.as_str()),
                ("key", self.api_key.as_str()),
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
            tracing::warn!(
                status = %status,
                destinations = destinations.len(),
                "Distance matrix HTTP error {}: {}",
                status,
                error_text
            );
            return Err(AppError::upstream_status(
                SERVICE,
                status.as_u16(),
                error_text,
            ));
        }

        let matrix: DistanceMatrixApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Failed to parse response: {}", e)))?;

        matrix.into_elements(destinations.len())
    }
}

// Distance Matrix API response types

#[derive(Debug, Deserialize)]
struct DistanceMatrixApiResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<MatrixValue>,
    distance: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

impl DistanceMatrixApiResponse {
    /// Flatten the single origin row into one element per destination.
    /// A short row is padded with failed elements so positions stay aligned.
    fn into_elements(self, expected: usize) -> Result<Vec<RouteElement>> {
        if self.status != "OK" {
            let detail = self.error_message.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                format!("Status {}: {}", self.status, detail),
            ));
        }

        let mut elements: Vec<RouteElement> = self
            .rows
            .into_iter()
            .next()
            .map(|row| row.elements)
            .unwrap_or_default()
            .into_iter()
            .take(expected)
            .map(|el| RouteElement {
                status: el.status,
                duration_seconds: el.duration.map(|d| d.value),
                distance_meters: el.distance.map(|d| d.value),
            })
            .collect();

        elements.resize_with(expected, || RouteElement::failed("MISSING"));
        Ok(elements)
    }
}
