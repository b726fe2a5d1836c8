// Init-artifact reaper: runs after every successful start and removes the
// bootstrap leftovers that start created.

use chrono::{DateTime, Duration, Utc};

use nodevin_common::constants::{labels, ANONYMOUS_VOLUME_MAX_AGE_SECS, INIT_CONTAINER_PREFIX};

use crate::container::container_info::parse_created_at;
use crate::container::DockerCommandManager;

/// What a reaper pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub containers: Vec<String>,
    pub volumes: Vec<String>,
}

pub struct Reaper {
    docker: DockerCommandManager,
}

impl Reaper {
    pub fn new(docker: DockerCommandManager) -> Self {
        Self { docker }
    }

    pub async fn reap(&self) -> ReapReport {
        self.reap_at(Utc::now()).await
    }

    /// Reap relative to `now`. Every step logs and continues on failure.
    pub async fn reap_at(&self, now: DateTime<Utc>) -> ReapReport {
        let mut report = ReapReport::default();
        self.reap_init_containers(&mut report).await;
        self.reap_init_volumes(&mut report).await;
        self.reap_recent_anonymous_volumes(now, &mut report).await;
        report
    }

    async fn reap_init_containers(&self, report: &mut ReapReport) {
        let containers = match self.docker.list_containers_named(INIT_CONTAINER_PREFIX).await {
            Ok(containers) => containers,
            Err(e) => {
                tracing::error!("Failed to list init containers: {e}");
                return;
            }
        };
        for container in containers {
            let name = container.name().to_string();
            // The runtime's name filter matches substrings.
            if !name.starts_with(INIT_CONTAINER_PREFIX) {
                continue;
            }
            match self.docker.remove_containers(&[name.clone()], true).await {
                Ok(()) => {
                    tracing::info!("Removed init container {name}");
                    report.containers.push(name);
                }
                Err(e) => tracing::error!("Failed to remove init container {name}: {e}"),
            }
        }
    }

    async fn reap_init_volumes(&self, report: &mut ReapReport) {
        let filter = format!("label={}=true", labels::INIT_VOLUME);
        let volumes = match self.docker.list_volumes(&filter).await {
            Ok(volumes) => volumes,
            Err(e) => {
                tracing::error!("Failed to list init volumes: {e}");
                return;
            }
        };
        for volume in volumes {
            self.remove_volume(volume, report).await;
        }
    }

    async fn reap_recent_anonymous_volumes(&self, now: DateTime<Utc>, report: &mut ReapReport) {
        let filter = format!("label={}", labels::ANONYMOUS_VOLUME);
        let volumes = match self.docker.list_volumes(&filter).await {
            Ok(volumes) => volumes,
            Err(e) => {
                tracing::error!("Failed to list anonymous volumes: {e}");
                return;
            }
        };
        let max_age = Duration::seconds(ANONYMOUS_VOLUME_MAX_AGE_SECS);
        for volume in volumes {
            let created = match self.docker.volume_created_at(&volume).await {
                Ok(raw) => parse_created_at(&raw),
                Err(e) => {
                    tracing::error!("Failed to inspect volume {volume}: {e}");
                    continue;
                }
            };
            let Some(created) = created else {
                tracing::debug!("Volume {volume} has no readable CreatedAt, keeping it");
                continue;
            };
            if now.signed_duration_since(created) <= max_age {
                self.remove_volume(volume, report).await;
            }
        }
    }

    async fn remove_volume(&self, volume: String, report: &mut ReapReport) {
        match self.docker.remove_volume(&volume).await {
            Ok(()) => {
                tracing::info!("Removed volume {volume}");
                report.volumes.push(volume);
            }
            Err(e) => tracing::error!("Failed to remove volume {volume}: {e}"),
        }
    }
}
