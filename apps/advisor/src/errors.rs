use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::GatewayError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// User-facing messages are fixed strings. Diagnostic detail is logged, never returned.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Forbidden")]
    Forbidden,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::RateLimited => "rate_limited",
            AppError::Forbidden => "forbidden",
            AppError::Gateway(GatewayError::SchemaViolation { .. }) => "parse_error",
            AppError::Gateway(_) => "ai_error",
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                "internal_error"
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Je hebt te veel vragen gesteld. Wacht even en probeer het opnieuw.".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Toegang geweigerd.".to_string()),
            AppError::Gateway(e @ GatewayError::SchemaViolation { .. }) => {
                tracing::error!(raw_content = e.raw_payload(), "Response contract violation: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Het antwoord kon niet worden verwerkt. Probeer je vraag anders te formuleren."
                        .to_string(),
                )
            }
            AppError::Gateway(e) => {
                tracing::error!(raw_body = e.raw_payload(), "Generation error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Er ging iets mis bij het verwerken van je vraag. Probeer het later opnieuw."
                        .to_string(),
                )
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "De adviseur is tijdelijk niet beschikbaar.".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Er ging iets mis. Probeer het later opnieuw.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Er ging iets mis. Probeer het later opnieuw.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
