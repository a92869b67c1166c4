use crate::cache;
use crate::constants::MAX_MUNICIPALITY_NAME_CHARS;
use crate::error::{AppError, Result};
use crate::models::{Budget, BudgetKind, Coordinates};
use crate::quota::QuotaClass;
use crate::routes::{client_identity, consume_quota, sanitize_text};
use crate::services::discovery::{DiscoveryRequest, DiscoveryResult};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for spot discovery
#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    /// "lat,lng"
    pub origin: Option<String>,
    /// "time" (default) or "distance"
    pub mode: Option<String>,
    /// Minutes or kilometers, depending on `mode`
    pub value: Option<f64>,
    pub municipality: Option<String>,
}

impl SearchQueryParams {
    pub fn into_request(self) -> Result<DiscoveryRequest> {
        let kind = match self.mode.as_deref().map(str::trim) {
            None | Some("") => BudgetKind::Time,
            Some(mode) => mode.parse().map_err(AppError::InvalidRequest)?,
        };
        let value = self
            .value
            .ok_or_else(|| AppError::InvalidRequest("value is required".to_string()))?;
        let budget = Budget::new(kind, value).map_err(AppError::InvalidRequest)?;

        let origin = self
            .origin
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.parse::<Coordinates>().map_err(AppError::InvalidRequest))
            .transpose()?;

        let municipality = self
            .municipality
            .as_deref()
            .map(|raw| sanitize_text(raw, MAX_MUNICIPALITY_NAME_CHARS))
            .filter(|name| !name.is_empty());

        if origin.is_none() && municipality.is_none() {
            return Err(AppError::InvalidRequest(
                "Either origin or municipality is required".to_string(),
            ));
        }

        Ok(DiscoveryRequest {
            origin,
            budget,
            municipality,
        })
    }
}

/// GET /places/search
/// Group reachable attractions by municipality, or list attractions inside
/// one named municipality
pub async fn search_places(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<DiscoveryResult>> {
    let request = params.into_request()?;

    tracing::info!(
        mode = %request.budget.kind(),
        value = request.budget.value(),
        municipality = request.municipality.as_deref().unwrap_or(""),
        "Search request: origin={:?}, {} {}, municipality={:?}",
        request.origin.map(|o| (o.lat, o.lng)),
        request.budget.kind(),
        request.budget.value(),
        request.municipality
    );

    let cache_key = cache::search_cache_key(
        request.origin.as_ref(),
        Some(&request.budget),
        request.municipality.as_deref(),
    );

    if let Some(cached) = state.search_cache.get(&cache_key).await {
        tracing::info!("Cache hit for search {}", cache_key);
        return Ok(Json(cached));
    }

    consume_quota(&state, QuotaClass::Places, &client_identity(&headers))?;

    let result = state.discovery.discover(&request).await?;

    state
        .search_cache
        .set(cache_key, result.clone(), None)
        .await;

    Ok(Json(result))
}
