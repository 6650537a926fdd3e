//! Portal server process supervision.
//!
//! Owns at most one child at a time. The child handle, running flag, bound
//! port and launch generation share one lock; whichever of `stop()` or the
//! monitor task takes the handle first is the only one that reports its exit.

use crate::server::browser::{BrowserLauncher, SystemBrowser, portal_url};
use crate::server::child::{LaunchSpec, shutdown_child};
use crate::server::{PortManager, ServerError, ServerResult, ServerStatus, StatusNotifier};
use crate::settings::ProcessSettings;

use portal_config::ConfigStore;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use error_location::ErrorLocation;
use tokio::process::Child;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

/// Configuration record shared between the supervisor and the config endpoint.
pub type SharedConfig = Arc<Mutex<ConfigStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimings {
    /// Wait after launch before checking the child is still alive
    pub startup_grace: Duration,
    /// Liveness poll period of the monitor task
    pub monitor_interval: Duration,
    /// Wait after the termination request before killing
    pub shutdown_timeout: Duration,
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        Self::from(&ProcessSettings::default())
    }
}

impl From<&ProcessSettings> for SupervisorTimings {
    fn from(settings: &ProcessSettings) -> Self {
        Self {
            startup_grace: settings.startup_grace(),
            monitor_interval: settings.monitor_interval(),
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }
}

#[derive(Default)]
struct ProcessSlot {
    child: Option<Child>,
    running: bool,
    port: Option<u16>,
    generation: u64,
}

impl ProcessSlot {
    fn clear(&mut self) -> Option<Child> {
        self.running = false;
        self.port = None;
        self.child.take()
    }

    /// Drop the handle but stay flagged running, so `status()` reports
    /// `Error` until the next `stop()` or `start()`.
    fn fault(&mut self) {
        self.child = None;
        self.port = None;
        self.running = true;
    }

    fn is_faulted(&self) -> bool {
        self.running && self.child.is_none()
    }

    /// Poll the child once. `Some` when it is gone and the slot was cleared.
    fn poll_exit(&mut self) -> Option<ServerStatus> {
        let child = self.child.as_mut()?;

        match child.try_wait() {
            Ok(None) => None,
            Ok(Some(exit)) => {
                warn!("Server process ended unexpectedly ({exit})");
                self.clear();
                Some(ServerStatus::Stopped)
            }
            Err(e) => {
                error!("Error monitoring server: {e}");
                self.fault();
                Some(ServerStatus::Error)
            }
        }
    }
}

pub struct ProcessSupervisor {
    config: SharedConfig,
    launch: LaunchSpec,
    timings: SupervisorTimings,
    browser: Arc<dyn BrowserLauncher>,
    slot: Arc<Mutex<ProcessSlot>>,
    notifier: Arc<StatusNotifier>,
}

impl ProcessSupervisor {
    pub fn new(config: SharedConfig, launch: LaunchSpec, timings: SupervisorTimings) -> Self {
        Self {
            config,
            launch,
            timings,
            browser: Arc::new(SystemBrowser),
            slot: Arc::new(Mutex::new(ProcessSlot::default())),
            notifier: Arc::new(StatusNotifier::new()),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// Register the single status observer, replacing any previous one.
    ///
    /// Invoked synchronously on every transition, outside the process lock.
    pub fn set_status_callback<F>(&self, callback: F)
    where
        F: Fn(ServerStatus) + Send + Sync + 'static,
    {
        self.notifier.set_callback(Arc::new(callback));
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.notifier.subscribe()
    }

    /// Last status sent to observers.
    pub fn last_status(&self) -> ServerStatus {
        self.notifier.last()
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn is_port_available(port: u16) -> bool {
        PortManager::is_available(port)
    }

    /// `None` when nothing in `start..=65535` is free.
    pub fn find_available_port(start: u16) -> Option<u16> {
        PortManager::find_available(start)
    }

    /// Start the server.
    ///
    /// Succeeds without doing anything if it is already running. Otherwise
    /// launches on the configured port, or the next free port above it.
    pub async fn start(&self) -> bool {
        match self.launch_locked().await {
            Ok(Some(port)) => {
                info!("Server started on port {port}");
                self.notifier.notify(ServerStatus::Running);
                true
            }
            Ok(None) => true,
            Err(e) => {
                error!("Failed to start server: {e}");
                info!("Hint: {}", e.recovery_hint());
                self.notifier.notify(ServerStatus::Error);
                false
            }
        }
    }

    /// Launch under the slot lock. `Ok(None)` when already running.
    async fn launch_locked(&self) -> ServerResult<Option<u16>> {
        let mut slot = self.slot.lock().await;

        if slot.is_faulted() {
            debug!("Relaunching after a server error");
        } else if slot.running {
            if slot.poll_exit().is_none() {
                warn!("Server is already running");
                return Ok(None);
            }
            debug!("Previous server exited before its monitor noticed, relaunching");
        }

        let configured = self.config.lock().await.port();
        let port = PortManager::resolve(configured)?;

        let mut child = self.launch.spawn(port)?;

        tokio::time::sleep(self.timings.startup_grace).await;

        match child.try_wait()? {
            None => {}
            Some(exit) => {
                return Err(ServerError::StartupExited {
                    code: exit.code(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        slot.generation += 1;
        slot.child = Some(child);
        slot.running = true;
        slot.port = Some(port);
        self.spawn_monitor(slot.generation);

        Ok(Some(port))
    }

    /// Stop the server.
    ///
    /// Succeeds without notifying anyone if it is not running. After a
    /// server error there is no process left, so this only acknowledges the
    /// error and reports `Stopped`. Returns false if the process could not
    /// be terminated.
    pub async fn stop(&self) -> bool {
        let result = {
            let mut slot = self.slot.lock().await;
            if !slot.running {
                debug!("Stop requested but server is not running");
                return true;
            }

            match slot.clear() {
                Some(mut child) => {
                    info!("Stopping server");
                    let result = shutdown_child(&mut child, self.timings.shutdown_timeout)
                        .await
                        .map_err(|source| ServerError::ShutdownFailed {
                            source,
                            location: ErrorLocation::from(Location::caller()),
                        });
                    if result.is_err() {
                        slot.fault();
                    }
                    Some(result)
                }
                None => None,
            }
        };

        match result {
            None => {
                info!("Cleared server error state");
                self.notifier.notify(ServerStatus::Stopped);
                true
            }
            Some(Ok(exit)) => {
                info!("Server stopped ({exit})");
                self.notifier.notify(ServerStatus::Stopped);
                true
            }
            Some(Err(e)) => {
                error!("Error stopping server: {e}");
                self.notifier.notify(ServerStatus::Error);
                false
            }
        }
    }

    /// Current status.
    ///
    /// Polls the child, which reaps it if it has exited. The running flag
    /// and handle are left for `stop()` and the monitor to clear.
    pub async fn status(&self) -> ServerStatus {
        let mut slot = self.slot.lock().await;
        if !slot.running {
            return ServerStatus::Stopped;
        }

        match slot.child.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => ServerStatus::Running,
            _ => ServerStatus::Error,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.status().await == ServerStatus::Running
    }

    /// Port the running server is bound to.
    pub async fn port(&self) -> Option<u16> {
        self.slot.lock().await.port
    }

    /// Open the configured default page in the browser.
    ///
    /// Returns the URL that was dispatched, or `None` when the server is not
    /// running. A browser failure is logged and still returns the URL.
    pub async fn open_browser(&self) -> Option<String> {
        let port = {
            let slot = self.slot.lock().await;
            if !slot.running {
                warn!("Cannot open browser: server not running");
                return None;
            }
            slot.port?
        };

        let url = {
            let config = self.config.lock().await;
            portal_url(port, config.default_page())
        };

        match self.browser.open(&url) {
            Ok(()) => info!("Opened browser to {url}"),
            Err(e) => error!("Error opening browser: {e}"),
        }

        Some(url)
    }

    fn spawn_monitor(&self, generation: u64) {
        let slot = Arc::clone(&self.slot);
        let notifier = Arc::clone(&self.notifier);
        let interval = self.timings.monitor_interval;

        tokio::spawn(async move {
            debug!("Monitor started for generation {generation}");
            loop {
                tokio::time::sleep(interval).await;

                let exited = {
                    let mut slot = slot.lock().await;
                    if slot.generation != generation || slot.child.is_none() {
                        break;
                    }
                    slot.poll_exit()
                };

                if let Some(status) = exited {
                    notifier.notify(status);
                    break;
                }
            }
            debug!("Monitor for generation {generation} exiting");
        });
    }

    /// Put the slot in the state a failed liveness poll leaves behind.
    #[cfg(test)]
    pub(crate) async fn fault(&self) {
        self.slot.lock().await.fault();
        self.notifier.notify(ServerStatus::Error);
    }
}
