use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - liveness plus the server version
pub async fn health_check() -> Response {
    let health = json!({
        "status": "healthy",
        "service": "portal-server",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(health)).into_response()
}
