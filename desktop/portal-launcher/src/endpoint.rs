//! HTTP endpoint the configuration page posts to.

use crate::server::{HOST, ServerError, ServerResult, SharedConfig};
use crate::update::ConfigUpdate;

use portal_config::PortalConfig;

use std::io::ErrorKind;
use std::panic::Location;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode, header},
    routing::{get, post},
};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SaveConfigResponse {
    pub status: String,
    pub message: String,
}

impl SaveConfigResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
        }
    }
}

type SaveConfigReply = (StatusCode, Json<SaveConfigResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> SaveConfigReply {
    let response = SaveConfigResponse::error(message);
    warn!("Configuration update rejected: {}", response.message);
    (status, Json(response))
}

pub fn build_router(config: SharedConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/save_config", post(save_config))
        .route("/config", get(get_config))
        .layer(cors)
        .with_state(config)
}

/// Apply and persist a configuration update.
///
/// Either field may be omitted. Nothing is changed or saved unless every
/// supplied field is accepted, and a failed save rolls the change back.
pub async fn save_config(
    State(config): State<SharedConfig>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> SaveConfigReply {
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let mut store = config.lock().await;
    let previous_port = store.port();
    let previous_page = store.default_page().to_string();

    if let Err(rejected) = update.apply(&mut store) {
        return reject(StatusCode::BAD_REQUEST, rejected.to_string());
    }

    if let Err(e) = store.save() {
        error!("Failed to save configuration: {e}");
        // Memory stays in step with what is on disk
        store.set_port(i64::from(previous_port));
        store.set_default_page(&previous_page);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SaveConfigResponse::error(e.to_string())),
        );
    }

    info!(
        "Configuration updated: port={}, default_page={}",
        store.port(),
        store.default_page()
    );

    (
        StatusCode::OK,
        Json(SaveConfigResponse::success("Configuration saved successfully")),
    )
}

pub async fn get_config(State(config): State<SharedConfig>) -> Json<PortalConfig> {
    Json(config.lock().await.config().clone())
}

/// Bind the endpoint on the first free port at or above `start_port`.
pub async fn bind(start_port: u16) -> ServerResult<TcpListener> {
    for port in start_port..=u16::MAX {
        match TcpListener::bind((HOST, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ServerError::NoAvailablePort {
        start: start_port,
        end: u16::MAX,
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Serve the endpoint on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: SharedConfig, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Configuration endpoint listening on http://{addr}");

    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Configuration endpoint stopped");
    Ok(())
}
