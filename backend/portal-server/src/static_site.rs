//! Page resolution for the portal's `pages/` tree.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use log::debug;
use tower::ServiceExt;
use tower_http::services::ServeFile;

pub const PAGES_PREFIX: &str = "/pages/";
const PAGES_DIR: &str = "pages";
const INDEX_FILE: &str = "index.html";
const REDIRECT_BODY: &str = "Redirecting to <a href=\"/pages/\">NIA Engineering Portal</a>...";

#[derive(Debug, Clone)]
pub struct SiteState {
    pub root: Arc<PathBuf>,
}

impl SiteState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }
}

/// GET / - the portal lives under /pages/
pub async fn root_redirect() -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, PAGES_PREFIX),
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
        ],
        REDIRECT_BODY,
    )
        .into_response()
}

/// GET /pages/
pub async fn pages_index(State(site): State<SiteState>, request: Request) -> Response {
    serve_page(&site, "", request).await
}

/// GET /pages/{*path}
pub async fn page(
    State(site): State<SiteState>,
    UrlPath(relative): UrlPath<String>,
    request: Request,
) -> Response {
    serve_page(&site, &relative, request).await
}

async fn serve_page(site: &SiteState, relative: &str, request: Request) -> Response {
    let Some(path) = resolve_page(&site.root, relative) else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    debug!("Serving {relative:?} from {}", path.display());
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Map a path below `/pages/` to a file on disk.
///
/// Resolution order:
/// 1. Empty path: `pages/index.html`
/// 2. An existing file: that file
/// 3. An existing directory: its `index.html`
/// 4. Anything else: `pages/index.html` (client-side navigation fallback)
///
/// Returns None when even `pages/index.html` is missing. Paths containing
/// `..` or absolute components never leave the pages directory.
pub fn resolve_page(site_root: &Path, relative: &str) -> Option<PathBuf> {
    let pages_dir = site_root.join(PAGES_DIR);
    let index = pages_dir.join(INDEX_FILE);

    let relative = relative.trim_start_matches('/');
    if !relative.is_empty() && is_contained(relative) {
        let candidate = pages_dir.join(relative);
        if candidate.is_file() {
            return Some(candidate);
        }

        let nested_index = candidate.join(INDEX_FILE);
        if candidate.is_dir() && nested_index.is_file() {
            return Some(nested_index);
        }
    }

    index.is_file().then_some(index)
}

fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}
