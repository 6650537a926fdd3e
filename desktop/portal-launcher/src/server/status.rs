use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// Coarse server status reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Stopped,
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type StatusCallback = Arc<dyn Fn(ServerStatus) + Send + Sync>;

/// Fans a status transition out to the registered callback and the watch
/// channel.
pub(crate) struct StatusNotifier {
    callback: RwLock<Option<StatusCallback>>,
    status_tx: watch::Sender<ServerStatus>,
}

impl StatusNotifier {
    pub(crate) fn new() -> Self {
        let (status_tx, _) = watch::channel(ServerStatus::Stopped);
        Self {
            callback: RwLock::new(None),
            status_tx,
        }
    }

    /// Replace the single observer.
    pub(crate) fn set_callback(&self, callback: StatusCallback) {
        if let Ok(mut slot) = self.callback.write() {
            *slot = Some(callback);
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.status_tx.subscribe()
    }

    pub(crate) fn last(&self) -> ServerStatus {
        *self.status_tx.borrow()
    }

    /// Must not be called while the process slot lock is held.
    pub(crate) fn notify(&self, status: ServerStatus) {
        info!("Server status changed to: {status}");
        self.status_tx.send_replace(status);

        let callback = self.callback.read().ok().and_then(|slot| slot.clone());
        if let Some(callback) = callback {
            callback(status);
        }
    }
}
