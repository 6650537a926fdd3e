//! Launcher settings with validation and versioning.

use crate::server::{ServerError, ServerResult};

use portal_config::{LogLevel, MIN_PORT};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Settings version for migration support.
/// Increment when adding new fields or changing structure.
pub const SETTINGS_VERSION: u32 = 1;

/// Environment variable that overrides the launcher data directory.
pub const LAUNCHER_DIR_ENV: &str = "PORTAL_LAUNCHER_DIR";
pub const SETTINGS_FILENAME: &str = "launcher.toml";

const APP_DIR_NAME: &str = "nia-portal";
const FALLBACK_DIR_NAME: &str = ".nia-portal";
const LAUNCHER_SUBDIR: &str = "launcher";

const DEFAULT_STARTUP_GRACE_MS: u64 = 1000;
const DEFAULT_MONITOR_INTERVAL_MS: u64 = 1000;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ENDPOINT_START_PORT: u16 = 9092;
const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Settings file format version
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub process: ProcessSettings,

    #[serde(default)]
    pub endpoint: EndpointSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSettings {
    /// Server executable. Defaults to `portal-server` beside the launcher, then PATH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_program: Option<PathBuf>,

    /// Extra arguments passed to the server
    #[serde(default)]
    pub server_args: Vec<String>,

    /// Directory served as the site root; must contain pages/index.html.
    /// Defaults to the nearest such directory above the launcher executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_root: Option<PathBuf>,

    /// Wait after launch before confirming the server is alive (milliseconds)
    #[serde(default = "default_startup_grace")]
    pub startup_grace_ms: u64,

    /// Liveness poll interval (milliseconds)
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_ms: u64,

    /// Graceful shutdown timeout (seconds)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Serve the configuration endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First port tried for the endpoint
    #[serde(default = "default_endpoint_start_port")]
    pub start_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: LogLevel,

    /// Log directory (relative to the launcher data directory)
    #[serde(default = "default_log_dir")]
    pub directory: String,
}

// === Default Value Functions ===

fn default_version() -> u32 {
    SETTINGS_VERSION
}
fn default_startup_grace() -> u64 {
    DEFAULT_STARTUP_GRACE_MS
}
fn default_monitor_interval() -> u64 {
    DEFAULT_MONITOR_INTERVAL_MS
}
fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}
fn default_true() -> bool {
    true
}
fn default_endpoint_start_port() -> u16 {
    DEFAULT_ENDPOINT_START_PORT
}
fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}

// === Default Implementations ===

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            process: ProcessSettings::default(),
            endpoint: EndpointSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            server_program: None,
            server_args: Vec::new(),
            site_root: None,
            startup_grace_ms: default_startup_grace(),
            monitor_interval_ms: default_monitor_interval(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            start_port: default_endpoint_start_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            directory: default_log_dir(),
        }
    }
}

impl ProcessSettings {
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

// === Settings Operations ===

impl LauncherSettings {
    /// Get the launcher data directory.
    /// Priority: PORTAL_LAUNCHER_DIR env var > platform data dir > ./.nia-portal/launcher
    pub fn launcher_dir() -> ServerResult<PathBuf> {
        if let Ok(dir) = std::env::var(LAUNCHER_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        if let Some(dir) = dirs::data_dir() {
            return Ok(dir.join(APP_DIR_NAME).join(LAUNCHER_SUBDIR));
        }

        let cwd = std::env::current_dir()?;
        Ok(cwd.join(FALLBACK_DIR_NAME).join(LAUNCHER_SUBDIR))
    }

    /// Load settings from file, creating default if not exists.
    pub fn load_or_create(data_dir: &Path) -> ServerResult<Self> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);

        if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            let mut settings: Self =
                toml::from_str(&content).map_err(|e| ServerError::SettingsInvalid {
                    message: format!("{}: {e}", settings_path.display()),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            // Migrate if needed
            if settings.version < SETTINGS_VERSION {
                settings = Self::migrate(settings);
                settings.save(data_dir)?;
            }

            settings.validate()?;
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save(data_dir)?;
            Ok(settings)
        }
    }

    /// Save settings to file atomically.
    pub fn save(&self, data_dir: &Path) -> ServerResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|source| ServerError::DataDirCreation {
            path: data_dir.to_path_buf(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let settings_path = data_dir.join(SETTINGS_FILENAME);
        let content = toml::to_string_pretty(self).map_err(|e| ServerError::SettingsInvalid {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = settings_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &settings_path)?;

        Ok(())
    }

    /// Migrate settings from an older version.
    fn migrate(mut settings: Self) -> Self {
        // Version 0 -> 1: endpoint section introduced
        if settings.version == 0 {
            settings.endpoint = EndpointSettings::default();
            settings.version = 1;
        }

        settings
    }

    /// Validate settings values.
    pub fn validate(&self) -> ServerResult<()> {
        if self.process.startup_grace_ms == 0 {
            return Err(ServerError::SettingsInvalid {
                message: "Startup grace period must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.process.monitor_interval_ms == 0 {
            return Err(ServerError::SettingsInvalid {
                message: "Monitor interval must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.process.shutdown_timeout_secs == 0 {
            return Err(ServerError::SettingsInvalid {
                message: "Shutdown timeout must be > 0".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.endpoint.start_port < MIN_PORT {
            return Err(ServerError::SettingsInvalid {
                message: format!("Endpoint port must be >= {MIN_PORT} (unprivileged)"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    /// Absolute log directory under `data_dir`.
    pub fn logs_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.logging.directory)
    }
}
