// NetworkConfig: the normalised description of one node service, plus the
// field-wise merge used to layer caller overrides on catalogue defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use nodevin_common::constants::DEFAULT_VERSION;

/// CPU / memory pair used for both limits and reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpus: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,
}

impl ResourceSpec {
    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty() && self.memory.is_empty()
    }

    fn merge(&self, other: &ResourceSpec) -> ResourceSpec {
        ResourceSpec {
            cpus: pick(&self.cpus, &other.cpus),
            memory: pick(&self.memory, &other.memory),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResources {
    #[serde(default, skip_serializing_if = "ResourceSpec::is_empty")]
    pub limits: ResourceSpec,
    #[serde(default, skip_serializing_if = "ResourceSpec::is_empty")]
    pub reservations: ResourceSpec,
}

/// `deploy` block of a compose service. Only emitted when a field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    #[serde(default)]
    pub resources: DeployResources,
}

impl Deploy {
    pub fn is_empty(&self) -> bool {
        self.resources.limits.is_empty() && self.resources.reservations.is_empty()
    }

    fn merge(&self, other: &Deploy) -> Deploy {
        Deploy {
            resources: DeployResources {
                limits: self.resources.limits.merge(&other.resources.limits),
                reservations: self
                    .resources
                    .reservations
                    .merge(&other.resources.reservations),
            },
        }
    }
}

/// Top-level compose network definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDef {
    pub driver: String,
}

impl NetworkDef {
    pub fn bridge() -> Self {
        Self {
            driver: "bridge".to_string(),
        }
    }
}

/// Top-level compose volume definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDef {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl VolumeDef {
    pub fn labelled(key: &str, value: &str) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(key.to_string(), value.to_string());
        Self { labels }
    }
}

/// Start condition on another service in the same descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    pub condition: String,
}

impl DependsOn {
    pub fn started() -> Self {
        Self {
            condition: "service_started".to_string(),
        }
    }

    pub fn completed() -> Self {
        Self {
            condition: "service_completed_successfully".to_string(),
        }
    }
}

/// Everything needed to render one service of a compose descriptor.
///
/// Empty strings, empty sequences and empty maps mean "not set"; that is what
/// [`NetworkConfig::merge`] relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub image: String,
    pub version: String,
    pub container_name: String,
    pub command: String,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub networks: Vec<String>,
    pub deploy: Deploy,
    pub network_defs: BTreeMap<String, NetworkDef>,
    pub volume_defs: BTreeMap<String, VolumeDef>,
    pub environment: BTreeMap<String, String>,
    pub restart: String,
    pub depends_on: BTreeMap<String, DependsOn>,
    /// `service:alias` links giving companions a stable hostname for the chain.
    pub links: Vec<String>,
    /// Host directory of this node under the data root.
    pub local_path: String,
    /// Chain-data path inside the container.
    pub local_chain_data_path: String,
    pub snapshot_sync_cid: String,
    pub snapshot_data_filename: String,
}

impl NetworkConfig {
    /// Image reference as written to the descriptor. The `latest` tag is implicit.
    pub fn image_ref(&self) -> String {
        if self.version.is_empty() || self.version == DEFAULT_VERSION {
            self.image.clone()
        } else {
            format!("{}:{}", self.image, self.version)
        }
    }

    /// Image reference with an explicit tag, as passed to `docker pull`.
    pub fn tagged_image(&self) -> String {
        let tag = if self.version.is_empty() {
            DEFAULT_VERSION
        } else {
            &self.version
        };
        format!("{}:{}", self.image, tag)
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Non-empty scalars replace, non-empty sequences replace in full, maps are
    /// unioned with `overrides` winning on key collision.
    pub fn merge(&self, overrides: &NetworkConfig) -> NetworkConfig {
        NetworkConfig {
            image: pick(&self.image, &overrides.image),
            version: pick(&self.version, &overrides.version),
            container_name: pick(&self.container_name, &overrides.container_name),
            command: pick(&self.command, &overrides.command),
            ports: pick_seq(&self.ports, &overrides.ports),
            volumes: pick_seq(&self.volumes, &overrides.volumes),
            networks: pick_seq(&self.networks, &overrides.networks),
            deploy: self.deploy.merge(&overrides.deploy),
            network_defs: union(&self.network_defs, &overrides.network_defs),
            volume_defs: union(&self.volume_defs, &overrides.volume_defs),
            environment: union(&self.environment, &overrides.environment),
            restart: pick(&self.restart, &overrides.restart),
            depends_on: union(&self.depends_on, &overrides.depends_on),
            links: pick_seq(&self.links, &overrides.links),
            local_path: pick(&self.local_path, &overrides.local_path),
            local_chain_data_path: pick(
                &self.local_chain_data_path,
                &overrides.local_chain_data_path,
            ),
            snapshot_sync_cid: pick(&self.snapshot_sync_cid, &overrides.snapshot_sync_cid),
            snapshot_data_filename: pick(
                &self.snapshot_data_filename,
                &overrides.snapshot_data_filename,
            ),
        }
    }

    /// Name of the volume (or host path) backing the chain-data mount.
    pub fn chain_volume(&self) -> Option<&str> {
        self.volumes
            .first()
            .and_then(|v| v.split(':').next())
            .filter(|v| !v.is_empty())
    }
}

fn pick(base: &str, over: &str) -> String {
    let chosen = if over.is_empty() { base } else { over };
    chosen.to_string()
}

fn pick_seq(base: &[String], over: &[String]) -> Vec<String> {
    let chosen = if over.is_empty() { base } else { over };
    chosen.to_vec()
}

fn union<V: Clone>(base: &BTreeMap<String, V>, over: &BTreeMap<String, V>) -> BTreeMap<String, V> {
    let mut merged = base.clone();
    for (key, value) in over {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NetworkConfig {
        NetworkConfig {
            image: "fiftysix/bitcoin-core".into(),
            version: "latest".into(),
            container_name: "bitcoin-core".into(),
            command: "bitcoind".into(),
            ports: vec!["8332:8332".into(), "8333:8333".into()],
            volumes: vec!["bitcoin-core-data:/node/bitcoin-core".into()],
            networks: vec!["bitcoin-net".into()],
            environment: [("A".to_string(), "1".to_string())].into_iter().collect(),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn merge_with_empty_override_is_identity() {
        let b = base();
        assert_eq!(b.merge(&NetworkConfig::default()), b);
    }

    #[test]
    fn merge_replaces_set_fields_and_keeps_the_rest() {
        let over = NetworkConfig {
            command: "bitcoind -txindex=1".into(),
            ports: vec!["9000:8332".into()],
            environment: [
                ("A".to_string(), "2".to_string()),
                ("B".to_string(), "3".to_string()),
            ]
            .into_iter()
            .collect(),
            deploy: Deploy {
                resources: DeployResources {
                    limits: ResourceSpec {
                        cpus: "2".into(),
                        memory: String::new(),
                    },
                    ..DeployResources::default()
                },
            },
            ..NetworkConfig::default()
        };
        let merged = base().merge(&over);
        assert_eq!(merged.command, "bitcoind -txindex=1");
        assert_eq!(merged.ports, vec!["9000:8332"]);
        assert_eq!(merged.volumes, base().volumes);
        assert_eq!(merged.image, "fiftysix/bitcoin-core");
        assert_eq!(merged.environment["A"], "2");
        assert_eq!(merged.environment["B"], "3");
        assert_eq!(merged.deploy.resources.limits.cpus, "2");
        assert!(!merged.deploy.is_empty());
    }

    #[test]
    fn image_ref_omits_latest() {
        let mut cfg = base();
        assert_eq!(cfg.image_ref(), "fiftysix/bitcoin-core");
        assert_eq!(cfg.tagged_image(), "fiftysix/bitcoin-core:latest");
        cfg.version = "27.0".into();
        assert_eq!(cfg.image_ref(), "fiftysix/bitcoin-core:27.0");
    }

    #[test]
    fn chain_volume_is_host_side_of_first_mount() {
        assert_eq!(base().chain_volume(), Some("bitcoin-core-data"));
        assert_eq!(NetworkConfig::default().chain_volume(), None);
    }
}
