use anyhow::{Context, Result};
use std::path::Path;
use std::{fs, thread, time::Duration};
use walkdir::WalkDir;

/// The executable file extension for the current platform.
#[cfg(target_os = "windows")]
pub const EXE_EXTENSION: &str = ".exe";
#[cfg(not(target_os = "windows"))]
pub const EXE_EXTENSION: &str = "";

/// Filesystem helpers shared by the data-directory manager and the updater.
pub struct IOUtil;

impl IOUtil {
    /// Recursively delete a directory with retry logic.
    ///
    /// Bind-mounted node data is often still held open for a moment after a
    /// container stops, so removal is retried up to 3 times.
    pub fn delete_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        if path.symlink_metadata()?.file_type().is_symlink() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove symlink '{}'", path.display()))?;
            return Ok(());
        }

        let max_retries = 3;
        let mut last_err = None;

        for attempt in 0..max_retries {
            match fs::remove_dir_all(path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(
                        "Failed to delete '{}' (attempt {}): {}",
                        path.display(),
                        attempt + 1,
                        e
                    );
                    last_err = Some(e);
                    if attempt < max_retries - 1 {
                        thread::sleep(Duration::from_millis(100 * (attempt as u64 + 1)));
                    }
                }
            }
        }

        let err = last_err.map(anyhow::Error::from).unwrap_or_else(|| {
            anyhow::anyhow!("unknown error")
        });
        Err(err).with_context(|| {
            format!(
                "Failed to delete directory '{}' after {} retries",
                path.display(),
                max_retries
            )
        })
    }

    /// Total size in bytes of all regular files below `path`.
    ///
    /// Entries that cannot be read (permissions, races with a running node)
    /// are skipped rather than failing the whole walk.
    pub fn directory_size(path: &Path) -> u64 {
        WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }

    /// Human readable size using binary units, e.g. `1.5 GiB`.
    pub fn format_size(bytes: u64) -> String {
        const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
        if bytes < 1024 {
            return format!("{bytes} B");
        }
        let mut value = bytes as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        format!("{value:.1} {}", UNITS[unit])
    }
}
