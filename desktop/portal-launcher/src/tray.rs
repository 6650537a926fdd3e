//! Tray menu and status presentation.
//!
//! Maps server status to the text, tooltip and icon colour a tray shows,
//! and routes menu actions to the supervisor.

use crate::server::{BrowserLauncher, ProcessSupervisor, ServerStatus, SystemBrowser};

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const APP_TITLE: &str = "NIA Engineering Portal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconColor {
    Green,
    Red,
    Gray,
}

/// Menu entries, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    StartServer,
    StopServer,
    OpenPortal,
    Configure,
    Exit,
}

impl TrayAction {
    pub const ALL: [TrayAction; 5] = [
        Self::StartServer,
        Self::StopServer,
        Self::OpenPortal,
        Self::Configure,
        Self::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::StartServer => "Start Server",
            Self::StopServer => "Stop Server",
            Self::OpenPortal => "Open Portal",
            Self::Configure => "Configure...",
            Self::Exit => "Exit",
        }
    }

    /// Menu item id, also the command typed on the console.
    pub fn id(&self) -> &'static str {
        match self {
            Self::StartServer => "start",
            Self::StopServer => "stop",
            Self::OpenPortal => "open",
            Self::Configure => "configure",
            Self::Exit => "exit",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown menu action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for TrayAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.id() == id)
            .ok_or(UnknownAction(id))
    }
}

/// Whether the launcher keeps running after a menu action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Continue,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    pub status_text: String,
    pub tooltip: String,
    pub icon: IconColor,
}

impl TrayView {
    pub fn for_status(status: ServerStatus, port: Option<u16>) -> Self {
        match (status, port) {
            (ServerStatus::Running, Some(port)) => Self {
                status_text: format!("Server running on port {port}"),
                tooltip: format!("{APP_TITLE} - Server running on port {port}"),
                icon: IconColor::Green,
            },
            (ServerStatus::Running, None) => Self {
                status_text: "Server running".to_string(),
                tooltip: format!("{APP_TITLE} - Server running"),
                icon: IconColor::Green,
            },
            (ServerStatus::Stopped, _) => Self {
                status_text: "Server stopped".to_string(),
                tooltip: format!("{APP_TITLE} - Server stopped"),
                icon: IconColor::Red,
            },
            (ServerStatus::Error, _) => Self {
                status_text: "Server error".to_string(),
                tooltip: format!("{APP_TITLE} - Server error"),
                icon: IconColor::Gray,
            },
        }
    }
}

#[derive(Default)]
pub struct TrayPresenter {
    current: Mutex<Option<TrayView>>,
}

impl TrayPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render and record the view for a status change.
    pub fn update(&self, status: ServerStatus, port: Option<u16>) -> TrayView {
        let view = TrayView::for_status(status, port);
        info!("Tray: {} ({:?} icon)", view.status_text, view.icon);

        if let Ok(mut current) = self.current.lock() {
            *current = Some(view.clone());
        }

        view
    }

    /// Last view rendered, if any.
    pub fn current(&self) -> Option<TrayView> {
        self.current.lock().ok().and_then(|view| view.clone())
    }

    /// Follow the supervisor's status channel until it closes.
    pub fn follow(self: Arc<Self>, supervisor: Arc<ProcessSupervisor>) -> JoinHandle<()> {
        let mut status_rx = supervisor.subscribe();

        tokio::spawn(async move {
            let initial = *status_rx.borrow_and_update();
            self.update(initial, supervisor.port().await);

            while status_rx.changed().await.is_ok() {
                let status = *status_rx.borrow_and_update();
                self.update(status, supervisor.port().await);
            }
            debug!("Tray status follower exiting");
        })
    }
}

/// Routes menu actions to the supervisor.
pub struct TrayMenu {
    supervisor: Arc<ProcessSupervisor>,
    presenter: Arc<TrayPresenter>,
    browser: Arc<dyn BrowserLauncher>,
    config_url: Option<String>,
}

impl TrayMenu {
    pub fn new(supervisor: Arc<ProcessSupervisor>, presenter: Arc<TrayPresenter>) -> Self {
        Self {
            supervisor,
            presenter,
            browser: Arc::new(SystemBrowser),
            config_url: None,
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// URL opened by "Configure...". Without one the action only warns.
    pub fn with_config_url(mut self, url: impl Into<String>) -> Self {
        self.config_url = Some(url.into());
        self
    }

    /// Status line shown at the top of the menu.
    pub fn status_text(&self) -> String {
        self.presenter
            .current()
            .map(|view| view.status_text)
            .unwrap_or_else(|| "Server status unknown".to_string())
    }

    pub async fn perform(&self, action: TrayAction) -> MenuOutcome {
        info!("Tray menu: {}", action.label());

        match action {
            TrayAction::StartServer => {
                if !self.supervisor.start().await {
                    warn!("Server failed to start from tray menu");
                }
            }
            TrayAction::StopServer => {
                if !self.supervisor.stop().await {
                    warn!("Server failed to stop from tray menu");
                }
            }
            TrayAction::OpenPortal => {
                if self.supervisor.open_browser().await.is_none() {
                    warn!("Start the server before opening the portal");
                }
            }
            TrayAction::Configure => match &self.config_url {
                Some(url) => {
                    if let Err(e) = self.browser.open(url) {
                        error!("Error opening configuration: {e}");
                    }
                }
                None => warn!("Configuration endpoint is disabled"),
            },
            TrayAction::Exit => {
                self.supervisor.stop().await;
                return MenuOutcome::Exit;
            }
        }

        MenuOutcome::Continue
    }
}
