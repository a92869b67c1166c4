use crate::constants::MAX_PLACE_ID_CHARS;
use crate::error::{AppError, Result};
use crate::models::PlaceDetails;
use crate::quota::QuotaClass;
use crate::routes::{client_identity, consume_quota, sanitize_text};
use crate::services::upstream::with_deadline;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct DetailsQueryParams {
    pub id: Option<String>,
}

impl DetailsQueryParams {
    pub fn place_id(&self) -> Result<String> {
        let id = sanitize_text(self.id.as_deref().unwrap_or(""), MAX_PLACE_ID_CHARS);
        if id.is_empty() {
            return Err(AppError::InvalidRequest("id is required".to_string()));
        }
        Ok(id)
    }
}

/// GET /places/details?id=
pub async fn place_details(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DetailsQueryParams>,
) -> Result<Json<PlaceDetails>> {
    let place_id = params.place_id()?;
    tracing::debug!("Details request for {}", place_id);

    consume_quota(&state, QuotaClass::Places, &client_identity(&headers))?;

    let timeout = Duration::from_secs(state.discovery.config().upstream_timeout_secs);
    let details = with_deadline("Places", timeout, state.places.place_details(&place_id)).await?;

    Ok(Json(details))
}
