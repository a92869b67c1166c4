use crate::cache;
use crate::constants::CACHE_KEY_COORD_DECIMALS;
use crate::error::{AppError, Result};
use crate::models::{Budget, Coordinates, IsochroneResult};
use crate::quota::QuotaClass;
use crate::routes::{client_identity, consume_quota};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct IsochroneQueryParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Driving minutes
    pub time: Option<f64>,
    /// Driving kilometers
    pub distance: Option<f64>,
}

impl IsochroneQueryParams {
    /// Origin rounded to the cache key precision, plus exactly one budget.
    pub fn validate(&self) -> Result<(Coordinates, Budget)> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(AppError::InvalidRequest(
                "lat and lon are required".to_string(),
            ));
        };
        let origin = Coordinates::new(lat, lon)
            .map_err(AppError::InvalidRequest)?
            .round(CACHE_KEY_COORD_DECIMALS);

        let budget = match (self.time, self.distance) {
            (Some(minutes), None) => Budget::time(minutes),
            (None, Some(km)) => Budget::distance(km),
            _ => {
                return Err(AppError::InvalidRequest(
                    "Provide exactly one of time or distance".to_string(),
                ))
            }
        }
        .map_err(AppError::InvalidRequest)?;

        Ok((origin, budget))
    }
}

/// GET /isochrone
/// Reachable region for a budget and the municipalities it touches
pub async fn isochrone(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<IsochroneQueryParams>,
) -> Result<Json<IsochroneResult>> {
    let (origin, budget) = params.validate()?;

    tracing::info!(
        lat = origin.lat,
        lng = origin.lng,
        mode = %budget.kind(),
        value = budget.value(),
        "Isochrone request: ({:.4}, {:.4}), {} {}",
        origin.lat,
        origin.lng,
        budget.kind(),
        budget.value()
    );

    let cache_key = cache::isochrone_cache_key(&origin, &budget);
    if let Some(cached) = state.isochrone_cache.get(&cache_key).await {
        tracing::info!("Cache hit for isochrone {}", cache_key);
        return Ok(Json(cached));
    }

    consume_quota(&state, QuotaClass::Isoline, &client_identity(&headers))?;

    let result = state
        .isochrone
        .intersecting_municipalities(origin, &budget)
        .await?;

    state
        .isochrone_cache
        .set(cache_key, result.clone(), None)
        .await;

    Ok(Json(result))
}
