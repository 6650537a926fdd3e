use crate::health;
use crate::static_site::{self, SiteState};

use std::path::PathBuf;

use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Build the router serving the site rooted at `site_root`
pub fn build_router(site_root: impl Into<PathBuf>) -> Router {
    let site_root = site_root.into();

    Router::new()
        .route("/", get(static_site::root_redirect))
        .route("/health", get(health::health_check))
        .route("/pages/", get(static_site::pages_index))
        .route("/pages/{*path}", get(static_site::page))
        // Everything else (css, js, images) straight from the site root
        .fallback_service(ServeDir::new(&site_root))
        .with_state(SiteState::new(site_root))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
}
