use crate::cache;
use crate::constants::{DEFAULT_NEARBY_PLACE_TYPES, MAX_CITY_ID_CHARS, MAX_CITY_NAME_CHARS};
use crate::error::{AppError, Result};
use crate::models::{Coordinates, PointOfInterest};
use crate::quota::QuotaClass;
use crate::routes::{client_identity, consume_quota};
use crate::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct NearbyCenter {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    #[serde(alias = "cityId")]
    pub city_id: String,
    pub center: NearbyCenter,
    pub types: Option<Vec<String>>,
    /// Spots whose address mentions this name are listed first
    #[serde(alias = "cityName")]
    pub city_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyResponse {
    pub city_id: String,
    pub results: Vec<PointOfInterest>,
}

/// Validated form of a [`NearbyRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub city_id: String,
    pub center: Coordinates,
    pub types: Vec<String>,
    pub city_name: Option<String>,
}

fn is_place_type(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

impl NearbyRequest {
    pub fn validate(self) -> Result<NearbyQuery> {
        let city_id: String = self.city_id.trim().chars().take(MAX_CITY_ID_CHARS).collect();
        if city_id.is_empty() {
            return Err(AppError::InvalidRequest("city_id is required".to_string()));
        }

        let center =
            Coordinates::new(self.center.lat, self.center.lng).map_err(AppError::InvalidRequest)?;

        let types: Vec<String> = match self.types {
            Some(types) => types.into_iter().filter(|t| is_place_type(t)).collect(),
            None => DEFAULT_NEARBY_PLACE_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };
        if types.is_empty() {
            return Err(AppError::InvalidRequest(
                "types must contain at least one place type ([a-z_]+)".to_string(),
            ));
        }

        let city_name = self
            .city_name
            .map(|name| name.trim().chars().take(MAX_CITY_NAME_CHARS).collect::<String>())
            .filter(|name| !name.is_empty());

        Ok(NearbyQuery {
            city_id,
            center,
            types,
            city_name,
        })
    }
}

/// POST /nearby
/// Attractions around one city, optionally preferring ones inside it
pub async fn nearby_spots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NearbyRequest>,
) -> Result<Json<NearbyResponse>> {
    let query = request.validate()?;

    tracing::info!(
        city_id = %query.city_id,
        types = query.types.len(),
        "Nearby request for {} at ({:.4}, {:.4})",
        query.city_id,
        query.center.lat,
        query.center.lng
    );

    let cache_key = cache::nearby_cache_key(
        &query.city_id,
        &query.center,
        &query.types,
        query.city_name.as_deref(),
    );
    if let Some(cached) = state.nearby_cache.get(&cache_key).await {
        tracing::info!("Cache hit for nearby {}", cache_key);
        return Ok(Json(cached));
    }

    consume_quota(&state, QuotaClass::Places, &client_identity(&headers))?;

    let results = state
        .discovery
        .nearby_spots(query.center, &query.types, query.city_name.as_deref())
        .await?;

    let response = NearbyResponse {
        city_id: query.city_id,
        results,
    };
    state
        .nearby_cache
        .set(cache_key, response.clone(), None)
        .await;

    Ok(Json(response))
}
