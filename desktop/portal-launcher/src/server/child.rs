//! Launching and terminating the portal server process.

use crate::server::{ServerError, ServerResult};
use crate::settings::ProcessSettings;

use portal_config::LogLevel;

use std::io;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

const SERVER_BINARY: &str = "portal-server";
const PORT_ENV: &str = "PORT";
const LOG_LEVEL_ENV: &str = "PORTAL_LOG_LEVEL";
const LOG_COLORED_ENV: &str = "PORTAL_LOG_COLORED";
const SITE_ROOT_ENV: &str = "PORTAL_SITE_ROOT";
const PAGES_DIR: &str = "pages";
const INDEX_FILE: &str = "index.html";
const CHILD_LOG_TARGET: &str = "portal_server";

/// How to launch the server: program, arguments, working directory and
/// extra environment. The port is supplied per launch.
///
/// Without a working directory the child inherits the launcher's.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            envs: Vec::new(),
        }
    }

    /// Launch `portal-server` over the site root.
    ///
    /// The root is `process.site_root` when set, else the nearest directory
    /// at or above the launcher executable holding `pages/index.html`.
    /// Either way it must contain `pages/index.html`.
    #[track_caller]
    pub fn from_settings(settings: &ProcessSettings, log_level: LogLevel) -> ServerResult<Self> {
        let location = ErrorLocation::from(Location::caller());

        let site_root = match &settings.site_root {
            Some(root) if is_site_root(root) => root.clone(),
            Some(root) => {
                return Err(ServerError::SiteRootMissing {
                    searched: root.clone(),
                    location,
                });
            }
            None => default_site_root()?,
        };
        info!("Site root: {}", site_root.display());

        let program = settings
            .server_program
            .clone()
            .unwrap_or_else(default_server_program);

        Ok(Self::new(program)
            .with_args(settings.server_args.iter().cloned())
            .with_working_dir(&site_root)
            .with_env(SITE_ROOT_ENV, site_root.to_string_lossy())
            .with_env(LOG_LEVEL_ENV, log_level.as_str())
            .with_env(LOG_COLORED_ENV, "false"))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Spawn the server bound to `port` with its output forwarded to the
    /// launcher log.
    #[track_caller]
    pub fn spawn(&self, port: u16) -> ServerResult<Child> {
        let location = ErrorLocation::from(Location::caller());

        info!("Launching {} on port {port}", self.program.display());

        let mut child = self
            .command(port)
            .spawn()
            .map_err(|source| ServerError::ProcessSpawn {
                program: self.program.clone(),
                source,
                location,
            })?;

        spawn_log_readers(&mut child);
        Ok(child)
    }

    fn command(&self, port: u16) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(PORT_ENV, port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        command
    }
}

/// `portal-server` next to the launcher executable, else the bare name for
/// a `PATH` lookup.
pub fn default_server_program() -> PathBuf {
    let file_name = format!("{SERVER_BINARY}{}", std::env::consts::EXE_SUFFIX);

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let sibling = dir.join(&file_name);
        if sibling.is_file() {
            return sibling;
        }
    }

    PathBuf::from(file_name)
}

/// Nearest directory at or above the launcher executable holding
/// `pages/index.html`.
fn default_site_root() -> ServerResult<PathBuf> {
    let exe = std::env::current_exe()?;
    let start = exe.parent().unwrap_or(&exe);

    find_site_root(start).ok_or_else(|| ServerError::SiteRootMissing {
        searched: start.to_path_buf(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// First of `start` and its ancestors containing `pages/index.html`.
pub fn find_site_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| is_site_root(dir))
        .map(Path::to_path_buf)
}

fn is_site_root(dir: &Path) -> bool {
    dir.join(PAGES_DIR).join(INDEX_FILE).is_file()
}

fn spawn_log_readers(child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, "stdout"));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, "stderr"));
    }
}

async fn forward_lines<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: CHILD_LOG_TARGET, stream = name, "{line}");
    }
    debug!("Server {name} reader exiting");
}

/// Shut down a child, escalating to a hard kill after `grace`.
///
/// # Strategy
/// 1. Return at once if it already exited
/// 2. Request termination (SIGTERM on Unix, kill elsewhere)
/// 3. Wait up to `grace`, then kill and reap
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    request_termination(child)?;

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Server did not exit within {}s, killing it",
                grace.as_secs_f32()
            );
            child.kill().await?;
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    info!("Sending SIGTERM to pid {pid}");
    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
