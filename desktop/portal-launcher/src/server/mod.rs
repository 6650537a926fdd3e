mod browser;
mod child;
mod error;
mod port;
mod status;
mod supervisor;

pub use browser::{BrowserLauncher, SystemBrowser, portal_url};
pub use child::{LaunchSpec, default_server_program, find_site_root, shutdown_child};
pub use error::{Result as ServerResult, ServerError};
pub use port::{HOST, PortManager};
pub use status::{ServerStatus, StatusCallback};
pub use supervisor::{ProcessSupervisor, SharedConfig, SupervisorTimings};

pub(crate) use status::StatusNotifier;
