// tracing-subscriber initialisation for the CLI and for the daemon.

use crate::error::{NodevinError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set, `info` otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr so stdout stays free for tables and raw RPC bodies.
/// Calling this twice is harmless.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Daemon logging: every event goes to stdout and is appended to `log_file`.
pub fn init_daemon(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| NodevinError::io(log_file, e))?;

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file));

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_daemon_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("daemon.log");
        init_daemon(&log).unwrap();
        assert!(log.exists());
    }

    #[test]
    fn init_daemon_fails_on_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("missing/daemon.log");
        assert!(init_daemon(&log).is_err());
    }
}
