use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Maximum number of characters of an error description embedded in a
/// degraded recommendation explanation.
pub const ERROR_DETAIL_LIMIT: usize = 100;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Error description cut to [`ERROR_DETAIL_LIMIT`] characters, safe to show
    /// inside a recommendation explanation.
    pub fn truncated(&self) -> String {
        self.to_string().chars().take(ERROR_DETAIL_LIMIT).collect()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ProviderUnavailable(_) | AppError::ModelUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_caps_long_messages() {
        let err = AppError::ProviderUnavailable("x".repeat(500));
        let detail = err.truncated();
        assert_eq!(detail.chars().count(), ERROR_DETAIL_LIMIT);
        assert!(detail.starts_with("Provider unavailable: "));
    }

    #[test]
    fn test_truncated_keeps_short_messages() {
        let err = AppError::ModelUnavailable("empty catalog".to_string());
        assert_eq!(err.truncated(), "Model unavailable: empty catalog");
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let response = AppError::InvalidInput("user_id must be >= 1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_provider_unavailable_maps_to_service_unavailable() {
        let response = AppError::ProviderUnavailable("timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
