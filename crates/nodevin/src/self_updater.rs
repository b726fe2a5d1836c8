// SelfUpdater: checks the latest GitHub release and swaps the nodevin binary
// in the working directory. The running process is not restarted.

use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use nodevin_common::constants::{endpoints, paths, Architecture, OsPlatform};
use nodevin_common::constants::{CURRENT_ARCHITECTURE, CURRENT_PLATFORM};
use nodevin_common::{NodevinError, Result};
use nodevin_sdk::io_util::EXE_EXTENSION;
use nodevin_sdk::{NodevinPackage, StringUtil};

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default)]
    pub tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate(String),
    Installed { version: String, path: PathBuf },
}

/// Release asset for this platform, e.g. `nodevin-linux-amd64`.
pub fn asset_name(platform: OsPlatform, architecture: Architecture) -> String {
    let suffix = if platform == OsPlatform::Windows { ".exe" } else { "" };
    format!(
        "{}-{platform}-{architecture}{suffix}",
        NodevinPackage::BINARY_NAME
    )
}

pub struct SelfUpdater {
    client: Client,
    latest_release_url: String,
    download_base: String,
    install_dir: PathBuf,
    current_version: String,
}

impl SelfUpdater {
    /// Updater that installs into `install_dir` (the working directory).
    pub fn new(client: Client, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            latest_release_url: endpoints::LATEST_RELEASE.to_string(),
            download_base: endpoints::RELEASE_DOWNLOAD.to_string(),
            install_dir: install_dir.into(),
            current_version: NodevinPackage::VERSION.to_string(),
        }
    }

    pub fn with_endpoints(
        mut self,
        latest_release_url: impl Into<String>,
        download_base: impl Into<String>,
    ) -> Self {
        self.latest_release_url = latest_release_url.into();
        self.download_base = download_base.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Whether `tag` names a different release than the running one.
    pub fn needs_update(&self, tag: &str) -> bool {
        StringUtil::trim_version_prefix(tag)
            != StringUtil::trim_version_prefix(&self.current_version)
    }

    pub async fn latest_tag(&self) -> Result<String> {
        let response = self.client.get(&self.latest_release_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NodevinError::HttpFailed(format!(
                "GET {} returned HTTP {}",
                self.latest_release_url,
                status.as_u16()
            )));
        }
        let release: ReleaseInfo = response.json().await?;
        let tag = release.tag_name.trim().to_string();
        if tag.is_empty() {
            return Err(NodevinError::VersionParseFailed(
                "latest release has no tag_name".to_string(),
            ));
        }
        Ok(tag)
    }

    /// One binary-update pass.
    pub async fn run(&self) -> Result<UpdateOutcome> {
        let tag = self.latest_tag().await?;
        if !self.needs_update(&tag) {
            tracing::info!("nodevin {} is the latest release", self.current_version);
            return Ok(UpdateOutcome::UpToDate(tag));
        }

        tracing::info!(
            "Update available: current={}, latest={tag}",
            self.current_version
        );
        let url = format!(
            "{}/{tag}/{}",
            self.download_base.trim_end_matches('/'),
            asset_name(CURRENT_PLATFORM, CURRENT_ARCHITECTURE)
        );
        let download = self.install_dir.join(paths::UPDATE_DOWNLOAD_FILE);
        self.download(&url, &download).await?;
        let path = install(&download, &self.install_dir)?;
        tracing::info!(
            "Installed nodevin {tag} at '{}'; restart nodevin to use it",
            path.display()
        );
        Ok(UpdateOutcome::Installed { version: tag, path })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("Downloading {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NodevinError::HttpFailed(format!(
                "download of {url} failed with HTTP {}",
                status.as_u16()
            )));
        }
        let bytes = response.bytes().await?;
        std::fs::write(dest, &bytes).map_err(|e| NodevinError::io(dest, e))
    }
}

/// Move the downloaded file over the installed binary and make it executable.
fn install(download: &Path, install_dir: &Path) -> Result<PathBuf> {
    let target = install_dir.join(format!("{}{EXE_EXTENSION}", NodevinPackage::BINARY_NAME));
    std::fs::rename(download, &target).map_err(|e| NodevinError::io(&target, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| NodevinError::io(&target, e))?;
    }
    Ok(target)
}
