use portal_config::ConfigError;

use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to create data directory at {path}: {source} {location}")]
    DataDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Launcher settings invalid: {message} {location}")]
    SettingsInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to spawn server process {program}: {source} {location}")]
    ProcessSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("No site root with pages/index.html found from {searched} {location}")]
    SiteRootMissing {
        searched: PathBuf,
        location: ErrorLocation,
    },

    #[error("No available port in range {start}-{end} {location}")]
    NoAvailablePort {
        start: u16,
        end: u16,
        location: ErrorLocation,
    },

    #[error("Server exited during startup with exit code {code:?} {location}")]
    StartupExited {
        code: Option<i32>,
        location: ErrorLocation,
    },

    #[error("Failed to stop server process: {source} {location}")]
    ShutdownFailed {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Portal configuration error: {source} {location}")]
    Config {
        #[source]
        source: ConfigError,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },
}

impl ServerError {
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::NoAvailablePort { .. } => {
                "No available ports found above the configured port. \
                   Close other applications or choose a different port."
            }
            Self::ProcessSpawn { .. } => {
                "The portal server could not be launched. \
                   Check that portal-server is installed next to the launcher or on PATH."
            }
            Self::SiteRootMissing { .. } => {
                "The portal pages could not be located. \
                   Set process.site_root in launcher.toml to the directory containing pages/."
            }
            Self::StartupExited { .. } => {
                "The portal server exited right after starting. \
                   Check the launcher logs for its output."
            }
            Self::SettingsInvalid { .. } => {
                "Launcher settings file has invalid values. \
                   Check the logs for details or delete launcher.toml to use defaults."
            }
            Self::DataDirCreation { .. } => {
                "Unable to create launcher data directory. \
                   Check file permissions or available disk space."
            }
            Self::Config { .. } => {
                "The portal configuration could not be saved. \
                   Check file permissions in the configuration directory."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for ServerError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for ServerError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        Self::Config {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
