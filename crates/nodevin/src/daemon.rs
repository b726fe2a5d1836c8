// Background updater: one cooperative loop driving the binary-update and
// image-freshness passes on independent tickers until SIGINT/SIGTERM.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use nodevin_common::{NodevinError, Result};
use nodevin_engine::ImageUpdater;

use crate::self_updater::{SelfUpdater, UpdateOutcome};

pub const BINARY_UPDATE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
pub const IMAGE_UPDATE_PERIOD: Duration = Duration::from_secs(60);

/// One scheduled workflow.
#[async_trait]
pub trait UpdatePass: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self) -> Result<()>;
}

#[async_trait]
impl UpdatePass for SelfUpdater {
    fn name(&self) -> &'static str {
        "binary update"
    }

    async fn execute(&self) -> Result<()> {
        match self.run().await? {
            UpdateOutcome::UpToDate(_) => {}
            UpdateOutcome::Installed { version, .. } => {
                tracing::info!("nodevin {version} installed; restart the daemon to use it");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UpdatePass for ImageUpdater {
    fn name(&self) -> &'static str {
        "image update"
    }

    async fn execute(&self) -> Result<()> {
        let report = self.run_pass().await?;
        if !report.failed.is_empty() {
            tracing::warn!("Image update failed for: {}", report.failed.join(", "));
        }
        Ok(())
    }
}

pub struct Daemon {
    binary: Arc<dyn UpdatePass>,
    images: Arc<dyn UpdatePass>,
    binary_period: Duration,
    image_period: Duration,
}

impl Daemon {
    pub fn new(binary: Arc<dyn UpdatePass>, images: Arc<dyn UpdatePass>) -> Self {
        Self {
            binary,
            images,
            binary_period: BINARY_UPDATE_PERIOD,
            image_period: IMAGE_UPDATE_PERIOD,
        }
    }

    /// Run until `shutdown` is cancelled. A pass in flight always completes;
    /// shutdown is honoured at the next loop boundary.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut binary_tick = tokio::time::interval(self.binary_period);
        let mut image_tick = tokio::time::interval(self.image_period);
        binary_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        image_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Daemon running: binary update every {:?}, image update every {:?}",
            self.binary_period,
            self.image_period
        );
        loop {
            let pass = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = binary_tick.tick() => &self.binary,
                _ = image_tick.tick() => &self.images,
            };
            if let Err(e) = pass.execute().await {
                tracing::error!("{} failed: {e}", pass.name());
            }
        }
        tracing::info!("Daemon stopped");
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down after the current pass");
            ctrl_c_token.cancel();
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("SIGTERM received, shutting down after the current pass");
                token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {e}"),
        }
    });
}

pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    std::fs::write(path, pid.to_string()).map_err(|e| NodevinError::io(path, e))
}

/// PID recorded in `path`, if the file exists.
pub fn read_pid_file(path: &Path) -> Result<Option<i32>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(NodevinError::io(path, e)),
    };
    text.trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|_| {
            NodevinError::Serialization(format!("'{}' does not hold a PID", path.display()))
        })
}

pub fn remove_pid_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(NodevinError::io(path, e)),
    }
}

/// Send SIGTERM to the recorded daemon and remove the PID file. Returns
/// `false` when no daemon was recorded or it had already exited.
pub fn stop(pid_file: &Path) -> Result<bool> {
    let Some(pid) = read_pid_file(pid_file)? else {
        return Ok(false);
    };
    let signalled = terminate(pid)?;
    remove_pid_file(pid_file)?;
    Ok(signalled)
}

#[cfg(unix)]
fn terminate(pid: i32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => {
            tracing::info!("Daemon process {pid} is not running; removing stale PID file");
            Ok(false)
        }
        Err(e) => Err(NodevinError::PermissionDenied(format!(
            "cannot signal daemon process {pid}: {e}"
        ))),
    }
}

#[cfg(not(unix))]
fn terminate(pid: i32) -> Result<bool> {
    Err(NodevinError::UnsupportedPlatform(format!(
        "stopping daemon process {pid} needs a Unix-like system"
    )))
}

/// Daemon log contents, optionally only the last `tail` lines.
pub fn read_log(path: &Path, tail: Option<usize>) -> Result<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(NodevinError::io(path, e)),
    };
    let Some(tail) = tail else {
        return Ok(text);
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(tail);
    let mut out = lines[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// Re-run this binary as `daemon start` in the background. The child logs to
/// `log_file` itself; only its stderr (panics) is redirected there.
/// Returns the child's PID.
pub fn detach(log_file: &Path) -> Result<u32> {
    let exe = std::env::current_exe().map_err(|e| NodevinError::io("current executable", e))?;
    let stderr = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| NodevinError::io(log_file, e))?;
    let child = std::process::Command::new(&exe)
        .args(["daemon", "start"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(stderr)
        .spawn()
        .map_err(|e| NodevinError::io(&exe, e))?;
    Ok(child.id())
}
