//! Router construction.

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

use krishimitra_shared::{KrishiMitraError, ServerConfig};

use crate::error::{self, ApiError};

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub msg: &'static str,
}

/// Liveness check.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        msg: "Ping Successful",
    })
}

/// Build the application router. CORS admits only the configured client
/// origin, with credentials.
pub fn router(config: &ServerConfig) -> Result<Router, ApiError> {
    let origin = HeaderValue::from_str(config.cors_origin()).map_err(|e| {
        KrishiMitraError::config(format!("invalid CLIENT_URL {:?}: {e}", config.client_url))
    })?;

    // Credentials rule out wildcard methods and headers.
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request());

    Ok(Router::new()
        .route("/ping", get(ping))
        .fallback(error::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}
