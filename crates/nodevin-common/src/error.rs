// Error taxonomy shared by every nodevin library crate.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodevinError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("catalogue lookup failed: {0}")]
    CatalogueLookupFailed(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compose up failed: {0}")]
    ComposeUpFailed(String),

    #[error("compose down failed: {0}")]
    ComposeDownFailed(String),

    #[error("image pull failed: {0}")]
    PullFailed(String),

    #[error("runtime command failed: {0}")]
    RuntimeExecFailed(String),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("RPC call failed: {0}")]
    RpcFailed(String),

    #[error("HTTP request failed: {0}")]
    HttpFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("backup failed: {0}")]
    BackupFailed(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("volume not found: {0}")]
    VolumeNotFound(String),

    #[error("could not parse version: {0}")]
    VersionParseFailed(String),

    #[error("refusing to touch '{}': outside the nodevin data directory", .0.display())]
    OutsideDataRoot(PathBuf),
}

impl NodevinError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            let path = path.into();
            return NodevinError::PermissionDenied(format!("{}: {source}", path.display()));
        }
        NodevinError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_yaml::Error> for NodevinError {
    fn from(err: serde_yaml::Error) -> Self {
        NodevinError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for NodevinError {
    fn from(err: serde_json::Error) -> Self {
        NodevinError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for NodevinError {
    fn from(err: reqwest::Error) -> Self {
        NodevinError::HttpFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NodevinError>;
