//! The validated configuration record and its correction rules.

use crate::{DEFAULT_AVAILABLE_PAGES, DEFAULT_PAGE, DEFAULT_PORT, MAX_PORT, MIN_PORT};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PORT_KEY: &str = "port";
const DEFAULT_PAGE_KEY: &str = "default_page";
const AVAILABLE_PAGES_KEY: &str = "available_pages";

/// Settings shared between the launcher and the configuration endpoint.
///
/// Every instance reachable through [`crate::ConfigStore`] is consistent:
/// the port lies in `MIN_PORT..=MAX_PORT` and `default_page` is one of
/// `available_pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub port: u16,
    pub default_page: String,
    pub available_pages: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_page: String::from(DEFAULT_PAGE),
            available_pages: DEFAULT_AVAILABLE_PAGES
                .iter()
                .map(|page| String::from(*page))
                .collect(),
        }
    }
}

impl PortalConfig {
    /// Whether `port` is an acceptable server port.
    pub fn is_valid_port(port: i64) -> bool {
        (i64::from(MIN_PORT)..=i64::from(MAX_PORT)).contains(&port)
    }

    /// Build a consistent record from an arbitrary JSON candidate.
    ///
    /// Fields are checked independently; a missing or invalid field is
    /// replaced by its default. Never fails.
    pub fn validate(candidate: &Value) -> Self {
        let defaults = Self::default();

        let Some(fields) = candidate.as_object() else {
            warn!("Configuration is not a JSON object, using defaults");
            return defaults;
        };

        let available_pages = match fields.get(AVAILABLE_PAGES_KEY) {
            None => defaults.available_pages,
            Some(value) => Self::page_list(value).unwrap_or_else(|| {
                warn!("Invalid available_pages {value}, using defaults");
                defaults.available_pages
            }),
        };

        let port = match fields.get(PORT_KEY) {
            None => defaults.port,
            Some(value) => value
                .as_i64()
                .filter(|port| Self::is_valid_port(*port))
                .and_then(|port| u16::try_from(port).ok())
                .unwrap_or_else(|| {
                    warn!("Invalid port {value}, using default {DEFAULT_PORT}");
                    defaults.port
                }),
        };

        let fallback_page = Self::fallback_page(&available_pages);
        let default_page = match fields.get(DEFAULT_PAGE_KEY) {
            None => fallback_page,
            Some(value) => match value.as_str() {
                Some(page) if available_pages.iter().any(|p| p == page) => String::from(page),
                _ => {
                    warn!("Invalid default page {value}, using default {fallback_page}");
                    fallback_page
                }
            },
        };

        Self {
            port,
            default_page,
            available_pages,
        }
    }

    /// Whether the record satisfies every field rule.
    pub fn is_consistent(&self) -> bool {
        Self::is_valid_port(i64::from(self.port))
            && self.available_pages.iter().any(|p| *p == self.default_page)
    }

    /// A non-empty array made only of strings.
    fn page_list(value: &Value) -> Option<Vec<String>> {
        let pages = value
            .as_array()?
            .iter()
            .map(|page| page.as_str().map(String::from))
            .collect::<Option<Vec<_>>>()?;

        (!pages.is_empty()).then_some(pages)
    }

    /// The default page, or the first available page when a custom
    /// manifest does not contain it.
    fn fallback_page(available_pages: &[String]) -> String {
        if available_pages.iter().any(|p| p == DEFAULT_PAGE) {
            return String::from(DEFAULT_PAGE);
        }
        available_pages
            .first()
            .cloned()
            .unwrap_or_else(|| String::from(DEFAULT_PAGE))
    }
}
