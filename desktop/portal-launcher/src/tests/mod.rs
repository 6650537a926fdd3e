#[cfg(unix)]
mod supervisor;

use crate::server::{
    BrowserLauncher, LaunchSpec, ProcessSupervisor, ServerStatus, SharedConfig,
    SupervisorTimings,
};

use portal_config::{CONFIG_FILENAME, ConfigStore};

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

/// RAII guard for environment variables - automatically restores on drop
pub(crate) struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        unsafe {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self { key, original }
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            match &self.original {
                Some(val) => env::set_var(self.key, val),
                None => env::remove_var(self.key),
            }
        }
    }
}

/// Config store in a temp dir, shared the way the launcher shares it.
pub(crate) fn shared_config(port: u16) -> (TempDir, PathBuf, SharedConfig) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    let mut store = ConfigStore::load(&path);
    assert!(store.set_port(i64::from(port)));
    store.save().unwrap();
    (temp, path, Arc::new(tokio::sync::Mutex::new(store)))
}

/// Temp directory laid out as a site root.
pub(crate) fn site_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("pages")).unwrap();
    std::fs::write(temp.path().join("pages").join("index.html"), "<html></html>").unwrap();
    temp
}

/// A port the OS just handed out, released again.
pub(crate) fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub(crate) fn fast_timings() -> SupervisorTimings {
    SupervisorTimings {
        startup_grace: Duration::from_millis(150),
        monitor_interval: Duration::from_millis(50),
        shutdown_timeout: Duration::from_secs(2),
    }
}

/// Stand-in server: a shell script run instead of portal-server.
pub(crate) fn shell_spec(script: &str) -> LaunchSpec {
    LaunchSpec::new("sh").with_args(["-c".to_string(), script.to_string()])
}

/// Records URLs instead of opening them.
#[derive(Default)]
pub(crate) struct RecordingBrowser {
    pub(crate) urls: Mutex<Vec<String>>,
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub(crate) struct FailingBrowser;

impl BrowserLauncher for FailingBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Err(std::io::Error::other("no browser available"))
    }
}

/// Supervisor over `spec` with fast timings and a recording browser, plus
/// the list of statuses delivered to its callback.
pub(crate) struct Harness {
    pub(crate) supervisor: Arc<ProcessSupervisor>,
    pub(crate) browser: Arc<RecordingBrowser>,
    pub(crate) statuses: Arc<Mutex<Vec<ServerStatus>>>,
    _temp: TempDir,
}

impl Harness {
    pub(crate) fn new(spec: LaunchSpec, port: u16) -> Self {
        Self::with_timings(spec, port, fast_timings())
    }

    pub(crate) fn with_timings(spec: LaunchSpec, port: u16, timings: SupervisorTimings) -> Self {
        let (temp, _path, config) = shared_config(port);
        let browser = Arc::new(RecordingBrowser::default());

        let supervisor = ProcessSupervisor::new(config, spec, timings)
            .with_browser(Arc::clone(&browser) as Arc<dyn BrowserLauncher>);

        let statuses = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&statuses);
        supervisor.set_status_callback(move |status| recorded.lock().unwrap().push(status));

        Self {
            supervisor: Arc::new(supervisor),
            browser,
            statuses,
            _temp: temp,
        }
    }

    pub(crate) fn statuses(&self) -> Vec<ServerStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub(crate) fn opened_urls(&self) -> Vec<String> {
        self.browser.urls.lock().unwrap().clone()
    }

    /// Wait until the watch channel reports `status`.
    pub(crate) async fn wait_for(&self, status: ServerStatus, within: Duration) -> bool {
        let mut rx = self.supervisor.subscribe();
        tokio::time::timeout(within, rx.wait_for(|s| *s == status))
            .await
            .is_ok_and(|result| result.is_ok())
    }
}
