use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health - Boundary dataset and cache status
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut status = json!({
        "status": "ok",
        "checks": {}
    });

    match state.boundaries.all_municipalities().await {
        Ok(boundaries) => {
            status["checks"]["municipalities"] = json!(boundaries.len());
        }
        Err(e) => {
            status["checks"]["municipalities"] = json!({"error": e.to_string()});
            status["status"] = json!("error");
        }
    }

    status["checks"]["cache"] = json!({
        "search": state.search_cache.stats(),
        "isochrone": state.isochrone_cache.stats(),
        "nearby": state.nearby_cache.stats(),
    });

    Json(status)
}
