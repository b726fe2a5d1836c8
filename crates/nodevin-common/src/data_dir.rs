// Per-user data directory: `<home>/.nodevin/data/<containerName>/...`.
// Nothing outside the root is ever created or removed from here.

use crate::constants::paths;
use crate::error::{NodevinError, Result};
use nodevin_sdk::IOUtil;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Disk usage of a single network directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUsage {
    pub network: String,
    pub bytes: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    /// Use `root` as the data root. The directory is not created here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `<home>/.nodevin/data` from `HOME` (or `USERPROFILE`) and
    /// create it when absent.
    pub fn resolve() -> Result<Self> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .or_else(|| std::env::var_os("USERPROFILE").filter(|h| !h.is_empty()))
            .ok_or_else(|| {
                NodevinError::io(
                    paths::DATA_ROOT,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "neither HOME nor USERPROFILE is set",
                    ),
                )
            })?;
        let dir = Self::new(PathBuf::from(home).join(paths::DATA_ROOT));
        dir.ensure_root()?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| NodevinError::io(&self.root, e))
    }

    /// Path of the directory for `name` (a container name). Names that could
    /// escape the root are rejected.
    pub fn network_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if !valid {
            return Err(NodevinError::OutsideDataRoot(self.root.join(name)));
        }
        Ok(self.root.join(name))
    }

    /// Create the directory for `name` if needed and return its path.
    pub fn ensure_network(&self, name: &str) -> Result<PathBuf> {
        let path = self.network_path(name)?;
        fs::create_dir_all(&path).map_err(|e| NodevinError::io(&path, e))?;
        Ok(path)
    }

    /// Fail unless `path` lies strictly inside the data root.
    pub fn guard(&self, path: &Path) -> Result<()> {
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) || path == self.root {
            return Err(NodevinError::OutsideDataRoot(path.to_path_buf()));
        }
        Ok(())
    }

    /// Remove the directory for `name`. Returns whether anything was removed.
    pub fn remove_network(&self, name: &str) -> Result<bool> {
        let path = self.network_path(name)?;
        self.guard(&path)?;
        if !path.exists() {
            return Ok(false);
        }
        tracing::info!("Removing data directory '{}'", path.display());
        IOUtil::delete_directory(&path).map_err(|e| to_io_error(&path, e))?;
        Ok(true)
    }

    /// Remove the whole data root. Siblings of the root are left alone.
    pub fn remove_all(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        tracing::info!("Removing data root '{}'", self.root.display());
        IOUtil::delete_directory(&self.root).map_err(|e| to_io_error(&self.root, e))?;
        Ok(true)
    }

    /// Size of every network directory under the root, sorted by name.
    pub fn usage(&self) -> Vec<DirectoryUsage> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut usage: Vec<DirectoryUsage> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| {
                let path = entry.path();
                DirectoryUsage {
                    network: entry.file_name().to_string_lossy().into_owned(),
                    bytes: IOUtil::directory_size(&path),
                    path,
                }
            })
            .collect();
        usage.sort_by(|a, b| a.network.cmp(&b.network));
        usage
    }
}

fn to_io_error(path: &Path, err: anyhow::Error) -> NodevinError {
    let kind = err
        .root_cause()
        .downcast_ref::<std::io::Error>()
        .map(|e| e.kind())
        .unwrap_or(std::io::ErrorKind::Other);
    NodevinError::io(path, std::io::Error::new(kind, format!("{err:#}")))
}
