use portal_server::{ServeConfig, build_router, logger};

use std::error::Error;

use log::{error, info};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServeConfig::from_env();

    // Initialize logger (before any other logging)
    logger::initialize(config.log_level, config.log_file.clone(), config.colored)?;

    info!("Starting portal-server v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let app = build_router(config.site_root.clone());

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server running at: http://localhost:{}", listener.local_addr()?.port());
    info!(
        "Portal available at: http://localhost:{}/pages/",
        listener.local_addr()?.port()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM from the launcher on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
