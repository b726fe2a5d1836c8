// Image-freshness pass: compares each managed container's local image digest
// with the registry and recreates the container when they differ.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nodevin_common::constants::{endpoints, paths, INIT_CONTAINER_PREFIX};
use nodevin_common::{NodevinError, Result};

use crate::catalogue::{Catalogue, NetworkSpec};
use crate::container::{ContainerInfo, DockerCommandManager};

/// Where remote image digests come from.
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// Digest of `repository:tag` in the registry, e.g. `sha256:...`.
    async fn remote_digest(&self, repository: &str, tag: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct TagResponse {
    #[serde(default)]
    images: Vec<TagImage>,
}

#[derive(Deserialize)]
struct TagImage {
    #[serde(default)]
    digest: String,
}

/// Docker Hub's `v2/namespaces/<ns>/repositories/<repo>/tags/<tag>` endpoint.
pub struct DockerHubDigestSource {
    client: Client,
    base: String,
}

impl DockerHubDigestSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base: endpoints::DOCKER_HUB.to_string(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn tag_url(&self, repository: &str, tag: &str) -> Result<url::Url> {
        let (namespace, repo) = repository.split_once('/').ok_or_else(|| {
            NodevinError::HttpFailed(format!("'{repository}' has no namespace"))
        })?;
        let mut url = url::Url::parse(&self.base)
            .map_err(|e| NodevinError::HttpFailed(format!("invalid registry base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| NodevinError::HttpFailed("registry base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v2", "namespaces", namespace, "repositories", repo, "tags", tag]);
        Ok(url)
    }
}

#[async_trait]
impl DigestSource for DockerHubDigestSource {
    async fn remote_digest(&self, repository: &str, tag: &str) -> Result<String> {
        let url = self.tag_url(repository, tag)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NodevinError::HttpFailed(format!(
                "GET {url} returned HTTP {}",
                status.as_u16()
            )));
        }
        let body: TagResponse = response.json().await?;
        body.images
            .into_iter()
            .next()
            .map(|image| image.digest)
            .filter(|digest| !digest.is_empty())
            .ok_or_else(|| NodevinError::HttpFailed(format!("no image digest in {url}")))
    }
}

/// Digest part of a `repo@sha256:...` reference.
pub fn local_digest(repo_digest: &str) -> Option<&str> {
    repo_digest.split_once('@').map(|(_, digest)| digest)
}

/// Outcome of one pass, by container name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub current: Vec<String>,
    pub failed: Vec<String>,
    /// Init containers and containers with no descriptor in the working directory.
    pub skipped: Vec<String>,
}

pub struct ImageUpdater {
    docker: DockerCommandManager,
    digests: Arc<dyn DigestSource>,
    cwd: PathBuf,
}

impl ImageUpdater {
    pub fn new(
        docker: DockerCommandManager,
        digests: Arc<dyn DigestSource>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            docker,
            digests,
            cwd: cwd.into(),
        }
    }

    /// Check every managed container, running or not. A failure on one
    /// container is logged and the sweep moves on.
    pub async fn run_pass(&self) -> Result<UpdateReport> {
        let containers = self.docker.list_containers(true).await?;
        let mut report = UpdateReport::default();
        for container in containers.iter().filter(|c| c.is_managed()) {
            let name = container.name().to_string();
            let Some(file) = self.descriptor_for(&name) else {
                tracing::debug!("{name} is an init container, skipping");
                report.skipped.push(name);
                continue;
            };
            if !file.is_file() {
                tracing::debug!("No descriptor for {name} at {}, skipping", file.display());
                report.skipped.push(name);
                continue;
            }
            match self.update_container(container, &file).await {
                Ok(true) => {
                    tracing::info!("Updated {name} to the latest {}", container.image);
                    report.updated.push(name);
                }
                Ok(false) => {
                    tracing::debug!("{name} is up to date");
                    report.current.push(name);
                }
                Err(e) => {
                    tracing::error!("Failed to update {name}: {e}");
                    report.failed.push(name);
                }
            }
        }
        Ok(report)
    }

    /// Descriptor that defines `container_name`: its own for a main service,
    /// the parent's for a companion. `None` for init containers.
    fn descriptor_for(&self, container_name: &str) -> Option<PathBuf> {
        if container_name.starts_with(INIT_CONTAINER_PREFIX) {
            return None;
        }
        let owner = match Catalogue::spec_by_container(container_name) {
            Some(NetworkSpec {
                parent: Some(parent),
                ..
            }) => Catalogue::spec(parent).ok()?.container_name,
            Some(spec) => spec.container_name,
            None => container_name,
        };
        Some(self.cwd.join(paths::compose_file_name(owner)))
    }

    async fn update_container(&self, container: &ContainerInfo, file: &Path) -> Result<bool> {
        let (repository, tag) = container.image_and_tag();
        let remote = self.digests.remote_digest(repository, tag).await?;
        let image = format!("{repository}:{tag}");
        let local = self.docker.image_repo_digest(&image).await?;
        if local.as_deref().and_then(local_digest) == Some(remote.as_str()) {
            return Ok(false);
        }

        tracing::info!(
            "{} has a newer image ({remote}); recreating from {}",
            container.name(),
            file.display()
        );
        self.docker.compose_down(file).await?;
        self.docker.pull(&image).await?;
        self.docker.compose_up(file).await?;
        Ok(true)
    }
}
