//! Environment-driven settings for the static server.

use std::io::IsTerminal;
use std::path::PathBuf;

use log::info;
use portal_config::LogLevel;

pub const PORT_ENV: &str = "PORT";
pub const SITE_ROOT_ENV: &str = "PORTAL_SITE_ROOT";
pub const LOG_LEVEL_ENV: &str = "PORTAL_LOG_LEVEL";
pub const LOG_FILE_ENV: &str = "PORTAL_LOG_FILE";
pub const LOG_COLORED_ENV: &str = "PORTAL_LOG_COLORED";

const DEFAULT_PORT: u16 = 9001;
const HOST: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub port: u16,
    pub site_root: PathBuf,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub colored: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            site_root: PathBuf::from("."),
            log_level: LogLevel::default(),
            log_file: None,
            colored: std::io::stdout().is_terminal(),
        }
    }
}

impl ServeConfig {
    /// Build settings from the environment the launcher passes down.
    ///
    /// Unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(cwd) = std::env::current_dir() {
            config.site_root = cwd;
        }

        Self::apply_env_parse(PORT_ENV, &mut config.port);
        if let Ok(root) = std::env::var(SITE_ROOT_ENV) {
            config.site_root = PathBuf::from(root);
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.log_level = LogLevel::parse_lenient(&level);
        }
        if let Ok(file) = std::env::var(LOG_FILE_ENV) {
            config.log_file = Some(PathBuf::from(file));
        }
        if let Ok(val) = std::env::var(LOG_COLORED_ENV) {
            config.colored = val == "true" || val == "1";
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{HOST}:{}", self.port)
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  server: {}", self.bind_addr());
        info!("  site root: {}", self.site_root.display());
        info!("  logging: {} (colored: {})", self.log_level, self.colored);
    }

    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }
}
