// Constants shared across nodevin: platform detection, well-known paths,
// runtime labels and process return codes.

use std::fmt;

// ---------------------------------------------------------------------------
// Platform detection (compile-time)
// ---------------------------------------------------------------------------

/// Operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsPlatform {
    Linux,
    MacOS,
    Windows,
}

impl fmt::Display for OsPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsPlatform::Linux => write!(f, "linux"),
            OsPlatform::MacOS => write!(f, "darwin"),
            OsPlatform::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X64,
    Arm64,
    Other,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X64 => write!(f, "amd64"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Other => write!(f, "unknown"),
        }
    }
}

/// The current OS platform, detected at compile time.
#[cfg(target_os = "macos")]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::MacOS;
#[cfg(target_os = "windows")]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::Windows;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const CURRENT_PLATFORM: OsPlatform = OsPlatform::Linux;

/// The current CPU architecture, detected at compile time.
#[cfg(target_arch = "x86_64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::X64;
#[cfg(target_arch = "aarch64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Arm64;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Other;

// ---------------------------------------------------------------------------
// Container runtime
// ---------------------------------------------------------------------------

/// The runtime CLI every lifecycle operation shells out to.
pub const RUNTIME_PROGRAM: &str = "docker";

/// Registry namespace of the images nodevin manages, as it prefixes image refs.
pub const MANAGED_IMAGE_PREFIX: &str = "fiftysix/";

/// Compose schema version written into every descriptor.
pub const COMPOSE_VERSION: &str = "3.9";

/// Service key of the primary node inside a descriptor.
pub const MAIN_SERVICE: &str = "main-service";

/// Service key of the snapshot bootstrap helper.
pub const INIT_SERVICE: &str = "init-config";

/// Name prefix of transient bootstrap containers.
pub const INIT_CONTAINER_PREFIX: &str = "init-config-";

/// Default image tag.
pub const DEFAULT_VERSION: &str = "latest";

/// Environment variable our node images publish their software version in.
pub const NODE_VERSION_ENV: &str = "NODE_VERSION";

pub mod labels {
    /// Marks a volume as holding chain data for a given software.
    pub const BLOCKCHAIN_SOFTWARE: &str = "nodevin.blockchain.software";
    /// Marks a volume as a bootstrap artifact the reaper may delete.
    pub const INIT_VOLUME: &str = "nodevin.init.volume";
    /// Label docker attaches to anonymous volumes.
    pub const ANONYMOUS_VOLUME: &str = "com.docker.volume.anonymous";
}

/// Anonymous volumes younger than this are treated as artifacts of the
/// start that just ran.
pub const ANONYMOUS_VOLUME_MAX_AGE_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

pub mod paths {
    /// Data root, relative to the user's home directory.
    pub const DATA_ROOT: &str = ".nodevin/data";
    /// Layered settings file, looked up in the working directory.
    pub const CONFIG_FILE: &str = "config.yaml";
    pub const DAEMON_PID_FILE: &str = "/tmp/nodevin_daemon.pid";
    pub const DAEMON_LOG_FILE: &str = "/tmp/nodevin_daemon.log";
    /// Name the self-updater downloads a release to before swapping it in.
    pub const UPDATE_DOWNLOAD_FILE: &str = "nodevin_new";

    /// File name of the compose descriptor for `container_name`.
    pub fn compose_file_name(container_name: &str) -> String {
        format!("docker-compose_{container_name}.yml")
    }
}

// ---------------------------------------------------------------------------
// Outbound endpoints
// ---------------------------------------------------------------------------

pub mod endpoints {
    pub const LATEST_RELEASE: &str =
        "https://api.github.com/repos/fiftysixcrypto/nodevin/releases/latest";
    pub const RELEASE_DOWNLOAD: &str =
        "https://github.com/fiftysixcrypto/nodevin/releases/download";
    pub const DOCKER_HUB: &str = "https://hub.docker.com";
    pub const LOCAL_RPC_HOST: &str = "http://127.0.0.1";
}

// ---------------------------------------------------------------------------
// Return codes
// ---------------------------------------------------------------------------

pub mod return_code {
    pub const SUCCESS: i32 = 0;
    pub const TERMINATED_ERROR: i32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_file_name_format() {
        assert_eq!(
            paths::compose_file_name("bitcoin-core"),
            "docker-compose_bitcoin-core.yml"
        );
    }

    #[test]
    fn platform_display() {
        assert!(!CURRENT_PLATFORM.to_string().is_empty());
        assert!(!CURRENT_ARCHITECTURE.to_string().is_empty());
    }
}
