//! Launcher entry points behind the CLI subcommands.

use crate::endpoint;
use crate::logging::{LoggingContext, setup_logging};
use crate::server::{LaunchSpec, ProcessSupervisor, SharedConfig, SupervisorTimings};
use crate::settings::LauncherSettings;
use crate::tray::{MenuOutcome, TrayAction, TrayMenu, TrayPresenter};
use crate::update::ConfigUpdate;

use portal_config::{CONFIG_FILENAME, ConfigErrorResult, ConfigStore};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Open the configuration store, honouring a `--config-dir` override.
pub fn open_config(config_dir: Option<&Path>) -> ConfigErrorResult<ConfigStore> {
    match config_dir {
        Some(dir) => Ok(ConfigStore::load(dir.join(CONFIG_FILENAME))),
        None => ConfigStore::load_default(),
    }
}

/// Print the configuration as pretty JSON.
pub fn show_config(store: &ConfigStore) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(store.config())?);
    Ok(())
}

/// Apply a validated update and save it.
pub fn set_config(store: &mut ConfigStore, update: &ConfigUpdate) -> Result<(), Box<dyn Error>> {
    update.apply(store)?;
    store.save()?;
    println!(
        "Configuration saved: port={}, default_page={}",
        store.port(),
        store.default_page()
    );
    Ok(())
}

/// Run the portal server until Ctrl+C, SIGTERM or the exit menu action.
///
/// Startup order:
/// 1. Launcher settings, then logging
/// 2. Portal configuration
/// 3. Tray presenter and config endpoint
/// 4. Server, then browser
/// 5. Menu commands from the console
pub async fn run(config_dir: Option<&Path>, open_browser: bool) -> Result<(), Box<dyn Error>> {
    let data_dir = LauncherSettings::launcher_dir()?;
    let settings = LauncherSettings::load_or_create(&data_dir)?;

    let logging: LoggingContext =
        setup_logging(&settings.logs_dir(&data_dir), settings.logging.level)?;

    info!("Starting portal-launcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Launcher data directory: {}", data_dir.display());
    info!("Logging to {}", logging.current_log_path().display());

    let store = open_config(config_dir)?;
    store.log_summary();
    let config: SharedConfig = Arc::new(Mutex::new(store));

    let supervisor = Arc::new(ProcessSupervisor::new(
        Arc::clone(&config),
        LaunchSpec::from_settings(&settings.process, settings.logging.level)?,
        SupervisorTimings::from(&settings.process),
    ));
    supervisor.set_status_callback(|status| println!("Portal server {status}"));

    let presenter = Arc::new(TrayPresenter::new());
    let tray_task = Arc::clone(&presenter).follow(Arc::clone(&supervisor));

    let mut menu = TrayMenu::new(Arc::clone(&supervisor), Arc::clone(&presenter));

    let (endpoint_tx, endpoint_rx) = oneshot::channel::<()>();
    let endpoint_task = if settings.endpoint.enabled {
        let listener = endpoint::bind(settings.endpoint.start_port).await?;
        let endpoint_port = listener.local_addr()?.port();
        menu = menu.with_config_url(format!("http://localhost:{endpoint_port}/config"));
        let shutdown = async move {
            let _ = endpoint_rx.await;
        };
        Some(tokio::spawn(endpoint::serve(
            listener,
            Arc::clone(&config),
            shutdown,
        )))
    } else {
        info!("Configuration endpoint disabled");
        None
    };

    if supervisor.start().await {
        if open_browser && let Some(url) = supervisor.open_browser().await {
            println!("Portal available at {url}");
        }
    } else {
        warn!("Server did not start; use the start command to retry");
    }

    tokio::select! {
        () = shutdown_signal() => {}
        () = console_menu(&menu, console_commands()) => info!("Exit requested from menu"),
    }

    supervisor.stop().await;

    let _ = endpoint_tx.send(());
    if let Some(task) = endpoint_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Configuration endpoint failed: {e}"),
            Err(e) => error!("Configuration endpoint task panicked: {e}"),
        }
    }
    tray_task.abort();

    info!("Launcher stopped");
    Ok(())
}

/// Lines typed on stdin. Read on a plain thread so a pending read never
/// holds up runtime shutdown.
fn console_commands() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        for line in std::io::stdin().lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// Drive the menu from console commands. Resolves only on the exit action;
/// once input closes it waits forever and leaves shutdown to the signals.
async fn console_menu(menu: &TrayMenu, mut commands: mpsc::UnboundedReceiver<String>) {
    let ids = TrayAction::ALL.map(|action| action.id());
    println!("Commands: {}, status", ids.join(", "));

    while let Some(line) = commands.recv().await {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        if command.eq_ignore_ascii_case("status") {
            println!("{}", menu.status_text());
            continue;
        }

        match command.parse::<TrayAction>() {
            Ok(action) => {
                if menu.perform(action).await == MenuOutcome::Exit {
                    return;
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    debug!("Console input closed");
    std::future::pending::<()>().await;
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
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
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
