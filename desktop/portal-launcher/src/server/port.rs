//! Port availability probing.

use crate::server::{ServerError, ServerResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{info, warn};

pub const HOST: &str = "127.0.0.1";

pub struct PortManager;

impl PortManager {
    /// Check if a port is available for binding.
    ///
    /// Attempts to bind to 127.0.0.1:port. The socket is released when the
    /// listener is dropped, so a true result leaves the port free.
    pub fn is_available(port: u16) -> bool {
        std::net::TcpListener::bind((HOST, port)).is_ok()
    }

    /// First available port in `start..=65535`, or `None` when every port
    /// in that range is taken.
    pub fn find_available(start: u16) -> Option<u16> {
        (start..=u16::MAX).find(|port| Self::is_available(*port))
    }

    /// Resolve the port to launch on.
    ///
    /// Algorithm:
    /// 1. Use preferred port if free
    /// 2. Otherwise scan upward from it
    /// 3. Fail when the scan is exhausted
    #[track_caller]
    pub fn resolve(preferred: u16) -> ServerResult<u16> {
        if Self::is_available(preferred) {
            return Ok(preferred);
        }

        warn!("Port {preferred} is not available, finding alternative");

        match Self::find_available(preferred) {
            Some(port) => {
                info!("Using port {port} instead of {preferred}");
                Ok(port)
            }
            None => Err(ServerError::NoAvailablePort {
                start: preferred,
                end: u16::MAX,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
