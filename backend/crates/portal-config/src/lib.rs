mod config_store;
mod error;
mod log_level;
mod portal_config;

#[cfg(test)]
mod tests;

pub use config_store::ConfigStore;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use portal_config::PortalConfig;

pub const DEFAULT_PORT: u16 = 9091;
pub const MIN_PORT: u16 = 1024;
pub const MAX_PORT: u16 = 65535;
pub const DEFAULT_PAGE: &str = "index.html";
pub const DEFAULT_AVAILABLE_PAGES: [&str; 4] = [
    "index.html",
    "pages/plenary.html",
    "pages/committees/index.html",
    "pages/engineering/index.html",
];

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "PORTAL_CONFIG_DIR";
pub const CONFIG_FILENAME: &str = "config.json";

const APP_DIR_NAME: &str = "nia-portal";
const FALLBACK_DIR_NAME: &str = ".nia-portal";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const BACKUP_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
