//! JSON error responses.

use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use krishimitra_shared::KrishiMitraError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Route not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] KrishiMitraError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(path) => (StatusCode::NOT_FOUND, format!("Route not found: {path}")),
            ApiError::Domain(
                e @ (KrishiMitraError::Validation { .. } | KrishiMitraError::InputMissing { .. }),
            ) => (StatusCode::BAD_REQUEST, e.user_message()),
            ApiError::Domain(e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
