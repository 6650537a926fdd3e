use portal_config::{ConfigStore, MAX_PORT, MIN_PORT};

use serde::Deserialize;
use thiserror::Error;

/// A user edit of the portal configuration. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub default_page: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateRejected {
    #[error("Port {port} must be between {min} and {max}")]
    Port { port: i64, min: u16, max: u16 },

    #[error("Unknown page: {page}")]
    Page { page: String },
}

impl ConfigUpdate {
    /// Apply through the store's setters.
    ///
    /// All or nothing: the page is checked before the port is set, so a
    /// rejection leaves the store untouched.
    pub fn apply(&self, store: &mut ConfigStore) -> Result<(), UpdateRejected> {
        if let Some(page) = &self.default_page
            && !store.available_pages().contains(page)
        {
            return Err(UpdateRejected::Page { page: page.clone() });
        }

        if let Some(port) = self.port
            && !store.set_port(port)
        {
            return Err(UpdateRejected::Port {
                port,
                min: MIN_PORT,
                max: MAX_PORT,
            });
        }

        if let Some(page) = &self.default_page {
            store.set_default_page(page);
        }

        Ok(())
    }
}
