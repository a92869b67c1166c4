pub mod debug;
pub mod details;
pub mod isochrone;
pub mod nearby;
pub mod search;

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;

use crate::constants::DEFAULT_QUOTA_IDENTITY;
use crate::error::{AppError, Result};
use crate::quota::QuotaClass;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/places/search", get(search::search_places))
        .route("/places/details", get(details::place_details))
        .route("/isochrone", get(isochrone::isochrone))
        .route("/nearby", post(nearby::nearby_spots))
        .route("/debug/health", get(debug::health_check))
        .with_state(state)
}

/// Quota identity of a request: the raw `x-forwarded-for` value, or a shared
/// local identity when the header is absent.
pub(crate) fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_QUOTA_IDENTITY)
        .to_string()
}

/// Consume one unit of `class` quota for `identity`, or fail with `RateLimited`.
pub(crate) fn consume_quota(state: &AppState, class: QuotaClass, identity: &str) -> Result<()> {
    let now = Instant::now();
    let decision = state.quota.try_consume_at(class, identity, now);
    if decision.admitted {
        return Ok(());
    }

    Err(AppError::RateLimited(format!(
        "{} quota exhausted for {}, retry in {}s",
        class,
        identity,
        decision.retry_after(now).as_secs()
    )))
}

/// Trimmed input without characters that could end up in headers, logs or
/// upstream queries, capped at `max_chars` characters.
pub(crate) fn sanitize_text(raw: &str, max_chars: usize) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '`' | '$' | '\\'))
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_identity(&headers), "local");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 "));
        assert_eq!(client_identity(&headers), "203.0.113.7");
    }

    #[test]
    fn test_sanitize_strips_and_caps() {
        assert_eq!(sanitize_text("  <旭川市>  ", 60), "旭川市");
        assert_eq!(sanitize_text("a'b\"c`d$e\\f", 60), "abcdef");
        assert_eq!(sanitize_text("札幌市中央区", 2), "札幌");
    }
}
