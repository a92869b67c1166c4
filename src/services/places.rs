use crate::constants::MAX_DETAIL_REVIEWS;
use crate::error::{AppError, Result};
use crate::models::{Coordinates, PlaceCandidate, PlaceDetails, PlaceReview};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PLACES_BASE_URL: &str = "https://places.googleapis.com/v1";
const SERVICE: &str = "Places";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

const BASIC_FIELD_MASK: &str = "places.id,places.displayName,places.location";
const FULL_FIELD_MASK: &str = "places.id,places.displayName,places.location,places.rating,\
places.userRatingCount,places.photos,places.types,places.primaryType,places.googleMapsUri,\
places.formattedAddress";
const DETAILS_FIELD_MASK: &str =
    "id,displayName,formattedAddress,googleMapsUri,rating,userRatingCount,reviews,photos";

/// Response fields requested through `X-Goog-FieldMask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceFields {
    /// id, display name and location
    Basic,
    #[default]
    Full,
}

impl PlaceFields {
    fn field_mask(self) -> &'static str {
        match self {
            PlaceFields::Basic => BASIC_FIELD_MASK,
            PlaceFields::Full => FULL_FIELD_MASK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    pub center: Coordinates,
    pub radius_meters: f64,
    pub included_types: Vec<String>,
    pub max_results: u32,
    pub fields: PlaceFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub query: String,
    pub included_type: Option<String>,
    pub page_size: Option<u32>,
    pub fields: PlaceFields,
}

/// Source of place records: nearby search, free-text search and details.
#[async_trait]
pub trait PlacesClient: Send + Sync {
    async fn search_nearby(&self, request: &NearbySearch) -> Result<Vec<PlaceCandidate>>;

    async fn search_text(&self, request: &TextSearch) -> Result<Vec<PlaceCandidate>>;

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails>;
}

/// Google Places API (New) client.
#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
    language_code: String,
    region_code: String,
    timeout: Duration,
}

impl GooglePlacesClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            api_key,
            PLACES_BASE_URL.to_string(),
            "ja".to_string(),
            "JP".to_string(),
        )
    }

    pub fn with_config(
        api_key: String,
        base_url: String,
        language_code: String,
        region_code: String,
    ) -> Self {
        GooglePlacesClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language_code,
            region_code,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn authorized(&self, request: RequestBuilder, field_mask: &str) -> RequestBuilder {
        request
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", field_mask)
            .timeout(self.timeout)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<R> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::upstream(SERVICE, format!("{} timed out", what))
            } else {
                AppError::upstream(SERVICE, format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                status = %status,
                "Places {} HTTP error {}: {}",
                what,
                status,
                error_text
            );
            return Err(AppError::upstream_status(SERVICE, status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl PlacesClient for GooglePlacesClient {
    async fn search_nearby(&self, request: &NearbySearch) -> Result<Vec<PlaceCandidate>> {
        let body = NearbySearchBody {
            language_code: &self.language_code,
            region_code: &self.region_code,
            max_result_count: request.max_results,
            included_types: &request.included_types,
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: LatLng::from(request.center),
                    radius: request.radius_meters,
                },
            },
        };

        tracing::debug!(
            lat = request.center.lat,
            lng = request.center.lng,
            radius_m = request.radius_meters,
            "Places nearby search: ({:.4}, {:.4}) r={:.0}m types={:?}",
            request.center.lat,
            request.center.lng,
            request.radius_meters,
            request.included_types
        );

        let url = format!("{}/places:searchNearby", self.base_url);
        let http = self.authorized(self.client.post(&url), request.fields.field_mask());
        let response: PlacesResponse = self.send(http.json(&body), "nearby search").await?;

        Ok(response.into_candidates())
    }

    async fn search_text(&self, request: &TextSearch) -> Result<Vec<PlaceCandidate>> {
        let body = TextSearchBody {
            text_query: &request.query,
            language_code: &self.language_code,
            region_code: &self.region_code,
            page_size: request.page_size,
            included_type: request.included_type.as_deref(),
        };

        tracing::debug!(query = %request.query, "Places text search: {}", request.query);

        let url = format!("{}/places:searchText", self.base_url);
        let http = self.authorized(self.client.post(&url), request.fields.field_mask());
        let response: PlacesResponse = self.send(http.json(&body), "text search").await?;

        Ok(response.into_candidates())
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        let url = format!("{}/places/{}", self.base_url, place_id);
        let http = self
            .authorized(self.client.get(&url), DETAILS_FIELD_MASK)
            .query(&[("languageCode", self.language_code.as_str())]);

        let raw: RawPlace = self.send(http, "details").await?;
        Ok(raw.into_details(place_id))
    }
}

// Request bodies

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbySearchBody<'a> {
    language_code: &'a str,
    region_code: &'a str,
    max_result_count: u32,
    included_types: &'a [String],
    location_restriction: LocationRestriction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSearchBody<'a> {
    text_query: &'a str,
    language_code: &'a str,
    region_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    included_type: Option<&'a str>,
}

#[derive(Serialize)]
struct LocationRestriction {
    circle: Circle,
}

#[derive(Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<Coordinates> for LatLng {
    fn from(c: Coordinates) -> Self {
        LatLng {
            latitude: c.lat,
            longitude: c.lng,
        }
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    places: Vec<RawPlace>,
}

impl PlacesResponse {
    fn into_candidates(self) -> Vec<PlaceCandidate> {
        self.places.into_iter().map(RawPlace::into_candidate).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlace {
    id: Option<String>,
    /// Resource name, `places/{id}`
    name: Option<String>,
    display_name: Option<LocalizedText>,
    location: Option<LatLng>,
    rating: Option<f64>,
    #[serde(alias = "userRatingsTotal")]
    user_rating_count: Option<u32>,
    #[serde(default)]
    photos: Vec<RawPhoto>,
    #[serde(default)]
    types: Vec<String>,
    primary_type: Option<String>,
    google_maps_uri: Option<String>,
    formatted_address: Option<String>,
    #[serde(default)]
    reviews: Vec<RawReview>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    rating: Option<f64>,
    text: Option<LocalizedText>,
    publish_time: Option<String>,
    author_attribution: Option<AuthorAttribution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorAttribution {
    display_name: Option<String>,
}

impl RawPlace {
    fn resolved_id(&self) -> Option<String> {
        self.id.clone().or_else(|| {
            self.name
                .as_deref()
                .map(|n| n.strip_prefix("places/").unwrap_or(n).to_string())
        })
    }

    fn display_name(&self) -> Option<String> {
        self.display_name.as_ref().and_then(|d| d.text.clone())
    }

    fn photo_ref(&self) -> Option<String> {
        self.photos.first().and_then(|p| p.name.clone())
    }

    fn into_candidate(self) -> PlaceCandidate {
        PlaceCandidate {
            id: self.resolved_id().unwrap_or_default(),
            name: self.display_name().unwrap_or_default(),
            location: self
                .location
                .as_ref()
                .and_then(|l| Coordinates::new(l.latitude, l.longitude).ok()),
            rating: self.rating,
            rating_count: self.user_rating_count,
            photo_ref: self.photo_ref(),
            maps_url: self.google_maps_uri,
            address: self.formatted_address,
            primary_type: self.primary_type,
            types: self.types,
        }
    }

    fn into_details(self, requested_id: &str) -> PlaceDetails {
        let reviews = self
            .reviews
            .iter()
            .take(MAX_DETAIL_REVIEWS)
            .map(|r| PlaceReview {
                author: r
                    .author_attribution
                    .as_ref()
                    .and_then(|a| a.display_name.clone()),
                rating: r.rating,
                text: r.text.as_ref().and_then(|t| t.text.clone()),
                published_at: r.publish_time.clone(),
            })
            .collect();

        PlaceDetails {
            id: self
                .resolved_id()
                .unwrap_or_else(|| requested_id.to_string()),
            name: self.display_name(),
            address: self.formatted_address.clone(),
            rating: self.rating,
            rating_count: self.user_rating_count,
            reviews,
            photo_ref: self.photo_ref(),
            maps_url: self.google_maps_uri.clone(),
        }
    }
}
