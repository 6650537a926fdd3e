use crate::{
    APP_DIR_NAME, BACKUP_DATE_FORMAT, CONFIG_DIR_ENV, CONFIG_FILENAME, ConfigError,
    ConfigErrorResult, FALLBACK_DIR_NAME, PortalConfig,
};

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;

/// JSON-backed owner of the [`PortalConfig`] record.
///
/// Not internally synchronized. Callers that share a store between
/// threads wrap it in a mutex.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: PortalConfig,
}

impl ConfigStore {
    /// Load the store at `path`.
    ///
    /// Loading order:
    /// 1. Missing file: write defaults and use them
    /// 2. Unreadable or unparseable file: back it up (if corrupt), write defaults
    /// 3. Parseable file: correct each invalid field to its default
    ///
    /// Never fails; every problem is logged and resolved with defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let config = match Self::read(&path) {
            Ok(Some(candidate)) => {
                info!("Configuration loaded from {}", path.display());
                PortalConfig::validate(&candidate)
            }
            Ok(None) => {
                info!("Configuration file not found, creating default");
                Self::persist_default(&path)
            }
            Err(e) => {
                error!("Error loading configuration: {e}");
                if e.is_corruption() {
                    Self::backup_corrupted(&path);
                }
                Self::persist_default(&path)
            }
        };

        Self { path, config }
    }

    /// Load from [`ConfigStore::default_path`].
    pub fn load_default() -> ConfigErrorResult<Self> {
        Ok(Self::load(Self::default_path()?))
    }

    /// Get the config directory.
    /// Priority: PORTAL_CONFIG_DIR env var > platform config dir > ./.nia-portal/
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        if let Some(dir) = dirs::config_dir() {
            return Ok(dir.join(APP_DIR_NAME));
        }

        let cwd = std::env::current_dir().map_err(|_| ConfigError::NoConfigDir)?;
        Ok(cwd.join(FALLBACK_DIR_NAME))
    }

    pub fn default_path() -> ConfigErrorResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Persist the current record.
    pub fn save(&self) -> ConfigErrorResult<()> {
        Self::write_atomic(&self.path, &self.config)?;
        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Set the server port.
    ///
    /// Accepts any integer so untyped input (JSON bodies, CLI flags) can be
    /// passed straight through. Returns false and keeps the current value
    /// when the port is outside 1024..=65535.
    pub fn set_port(&mut self, port: i64) -> bool {
        if !PortalConfig::is_valid_port(port) {
            warn!("Rejected port {port}");
            return false;
        }

        match u16::try_from(port) {
            Ok(port) => {
                self.config.port = port;
                true
            }
            Err(_) => false,
        }
    }

    pub fn default_page(&self) -> &str {
        &self.config.default_page
    }

    /// Set the page opened in the browser.
    ///
    /// Returns false and keeps the current value when `page` is not one of
    /// the available pages.
    pub fn set_default_page(&mut self, page: &str) -> bool {
        if !self.config.available_pages.iter().any(|p| p == page) {
            warn!("Rejected default page {page:?}: not an available page");
            return false;
        }

        self.config.default_page = String::from(page);
        true
    }

    pub fn available_pages(&self) -> &[String] {
        &self.config.available_pages
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration ({}):", self.path.display());
        info!("  port: {}", self.config.port);
        info!("  default_page: {}", self.config.default_page);
        info!(
            "  available_pages: {} ({})",
            self.config.available_pages.len(),
            self.config.available_pages.join(", ")
        );
    }

    /// Read and parse the file. `Ok(None)` when it does not exist.
    fn read(path: &Path) -> ConfigErrorResult<Option<Value>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read(path).map_err(|e| ConfigError::io(path, e))?;

        // Bytes, not text: invalid UTF-8 is a parse failure like any other
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| ConfigError::Json {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Write defaults, logging (not returning) any failure.
    fn persist_default(path: &Path) -> PortalConfig {
        let config = PortalConfig::default();

        match Self::write_atomic(path, &config) {
            Ok(()) => info!("Default configuration saved to {}", path.display()),
            Err(e) => error!("Error saving default configuration: {e}"),
        }

        config
    }

    /// Write via temp file then rename so an interrupted save never leaves
    /// a truncated config behind.
    fn write_atomic(path: &Path, config: &PortalConfig) -> ConfigErrorResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let content =
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::serde(e.to_string()))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| ConfigError::io(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ConfigError::io(path, e)
        })
    }

    /// Rename a corrupt file to `<name>.corrupted.<timestamp>`.
    fn backup_corrupted(path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let timestamp = chrono::Utc::now().format(BACKUP_DATE_FORMAT);
        let backup_path = path.with_file_name(format!("{file_name}.corrupted.{timestamp}"));

        match fs::rename(path, &backup_path) {
            Ok(()) => {
                warn!("Backed up corrupted configuration to {}", backup_path.display());
                Some(backup_path)
            }
            Err(e) => {
                warn!("Failed to back up corrupted configuration: {e}");
                None
            }
        }
    }
}
