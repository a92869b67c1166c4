use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{service} API error: {message}")]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Boundary data error: {0}")]
    BoundaryData(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service,
            status: None,
            message: message.into(),
        }
    }

    pub fn upstream_status(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        AppError::Upstream {
            service,
            status: Some(status),
            message: format!("HTTP {}: {}", status, body.into()),
        }
    }
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Upstream { service, ref message, .. } => {
                tracing::error!(service, "Upstream {} error: {}", service, message);
                (StatusCode::BAD_GATEWAY, "Upstream service error")
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::RateLimited(ref e) => {
                tracing::info!("Rate limited: {}", e);
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
            }
            AppError::BoundaryData(ref e) => {
                tracing::error!("Boundary data error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Municipality boundaries unavailable")
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
