//! Tray launcher for the NIA Engineering Portal.
//!
//! Supervises a local `portal-server` process, serves the configuration
//! endpoint and maps server status for a tray icon.

pub mod app;
pub mod cli;
pub mod endpoint;
pub mod logging;
pub mod server;
pub mod settings;
pub mod tray;
pub mod update;

#[cfg(test)]
mod tests;

pub use server::{
    BrowserLauncher, LaunchSpec, PortManager, ProcessSupervisor, ServerError, ServerResult,
    ServerStatus, SharedConfig, SupervisorTimings,
};
pub use settings::LauncherSettings;
pub use update::{ConfigUpdate, UpdateRejected};
