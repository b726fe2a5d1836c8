// Compose descriptor: serde model of the YAML handed to `docker compose`,
// built from a main NetworkConfig plus its companions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nodevin_common::constants::{paths, COMPOSE_VERSION, MAIN_SERVICE};
use nodevin_common::{NodevinError, Result};

use crate::network_config::{Deploy, DependsOn, NetworkConfig, NetworkDef, VolumeDef};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Deploy>,
}

impl From<&NetworkConfig> for ComposeService {
    fn from(cfg: &NetworkConfig) -> Self {
        Self {
            image: cfg.image_ref(),
            container_name: cfg.container_name.clone(),
            command: cfg.command.clone(),
            ports: cfg.ports.clone(),
            volumes: cfg.volumes.clone(),
            networks: cfg.networks.clone(),
            environment: cfg.environment.clone(),
            restart: cfg.restart.clone(),
            depends_on: cfg.depends_on.clone(),
            links: cfg.links.clone(),
            deploy: (!cfg.deploy.is_empty()).then(|| cfg.deploy.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub version: String,
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkDef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, VolumeDef>,
}

impl ComposeFile {
    /// Assemble a descriptor: `main` becomes `main-service`, each companion is
    /// keyed by its name, and network/volume definitions are unioned.
    pub fn from_configs(main: &NetworkConfig, companions: &[(String, NetworkConfig)]) -> Self {
        let mut file = ComposeFile {
            version: COMPOSE_VERSION.to_string(),
            ..ComposeFile::default()
        };
        let all = std::iter::once((MAIN_SERVICE, main))
            .chain(companions.iter().map(|(name, cfg)| (name.as_str(), cfg)));
        for (name, cfg) in all {
            file.services
                .insert(name.to_string(), ComposeService::from(cfg));
            for (key, def) in &cfg.network_defs {
                file.networks.insert(key.clone(), def.clone());
            }
            for (key, def) in &cfg.volume_defs {
                file.volumes.insert(key.clone(), def.clone());
            }
        }
        file
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| NodevinError::io(path, e))?;
        Self::from_yaml(&text)
    }

    pub fn main_service(&self) -> Option<&ComposeService> {
        self.services.get(MAIN_SERVICE)
    }

    /// Host port the main service publishes for `container_port`.
    pub fn main_host_port(&self, container_port: u16) -> Option<u16> {
        let target = container_port.to_string();
        self.main_service()?
            .ports
            .iter()
            .filter_map(|mapping| mapping.rsplit_once(':'))
            .find(|(_, container)| *container == target)
            .and_then(|(host, _)| host.rsplit(':').next()?.parse().ok())
    }
}

/// Path of the descriptor for `node_name` inside `cwd`.
pub fn compose_file_path(cwd: &Path, node_name: &str) -> PathBuf {
    cwd.join(paths::compose_file_name(node_name))
}

/// Render and write `docker-compose_<node_name>.yml` into `cwd`.
///
/// Identical inputs always produce byte-identical files.
pub fn create_compose_file(
    node_name: &str,
    cwd: &Path,
    base: &NetworkConfig,
    companions: &[(String, NetworkConfig)],
) -> Result<PathBuf> {
    let file = ComposeFile::from_configs(base, companions);
    let yaml = file.to_yaml()?;
    let path = compose_file_path(cwd, node_name);
    std::fs::write(&path, yaml).map_err(|e| NodevinError::io(&path, e))?;
    tracing::info!("Wrote compose file '{}'", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{Catalogue, Companion};
    use nodevin_common::Settings;

    fn bitcoin(settings: &Settings) -> NetworkConfig {
        let catalogue = Catalogue::new("/data");
        catalogue.resolve_main(Catalogue::spec("bitcoin").unwrap(), settings)
    }

    #[test]
    fn start_bitcoin_descriptor() {
        let cwd = tempfile::tempdir().unwrap();
        let config = bitcoin(&Settings::default());
        let path = create_compose_file("bitcoin-core", cwd.path(), &config, &[]).unwrap();
        assert_eq!(path, cwd.path().join("docker-compose_bitcoin-core.yml"));

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(yaml["version"].as_str(), Some("3.9"));
        let main = &yaml["services"]["main-service"];
        assert_eq!(main["image"].as_str(), Some("fiftysix/bitcoin-core"));
        assert_eq!(main["container_name"].as_str(), Some("bitcoin-core"));
        let ports: Vec<&str> = main["ports"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|p| p.as_str())
            .collect();
        assert_eq!(ports, vec!["8332:8332", "8333:8333"]);
        assert!(main["command"].as_str().unwrap().contains(
            "bitcoind --server=1 --rpcbind=0.0.0.0 --rpcport=8332 --rpcallowip=0.0.0.0/0 -rpcuser=user -rpcpassword=fiftysix"
        ));
        assert!(main.get("deploy").is_none());
        assert_eq!(yaml["networks"]["bitcoin-net"]["driver"].as_str(), Some("bridge"));
        assert_eq!(
            yaml["volumes"]["bitcoin-core-data"]["labels"]["nodevin.blockchain.software"].as_str(),
            Some("bitcoin")
        );
    }

    #[test]
    fn testnet_with_ord_has_two_services() {
        let catalogue = Catalogue::new("/data");
        let settings = Settings::default();
        let main_spec = Catalogue::resolve("bitcoin", true).unwrap();
        let ord_spec = Catalogue::companion_for(main_spec, Companion::Ord).unwrap();
        let main = catalogue.resolve_main(main_spec, &settings);
        let ord = catalogue.resolve_companion(ord_spec, main_spec, &settings);

        let file = ComposeFile::from_configs(&main, &[(ord_spec.key.to_string(), ord)]);
        assert_eq!(file.services.len(), 2);
        let main_svc = file.main_service().unwrap();
        assert!(main_svc.command.contains("--testnet"));
        assert!(main_svc.ports.contains(&"18332:18332".to_string()));
        assert!(file.services["ord-testnet"].command.ends_with(
            "--bitcoin-rpc-url http://bitcoin-core:18332 --bitcoin-rpc-username user --bitcoin-rpc-password fiftysix server"
        ));
        assert!(file.volumes.contains_key("ord-testnet-data"));
        assert!(file.volumes.contains_key("bitcoin-core-testnet-data"));
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let cwd = tempfile::tempdir().unwrap();
        let cfg = bitcoin(&Settings::default());
        let first = create_compose_file("bitcoin-core", cwd.path(), &cfg, &[]).unwrap();
        let a = std::fs::read(&first).unwrap();
        create_compose_file("bitcoin-core", cwd.path(), &cfg, &[]).unwrap();
        let b = std::fs::read(&first).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn yaml_parses_back_to_same_descriptor() {
        let settings = Settings {
            cpu_limit: "2".into(),
            mem_limit: "4g".into(),
            ..Settings::default()
        };
        let file = ComposeFile::from_configs(&bitcoin(&settings), &[]);
        let parsed = ComposeFile::from_yaml(&file.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, file);
        let deploy = parsed.main_service().unwrap().deploy.as_ref().unwrap();
        assert_eq!(deploy.resources.limits.memory, "4g");
    }

    #[test]
    fn main_host_port_follows_remap() {
        let settings = Settings {
            port: Some(18000),
            ..Settings::default()
        };
        let file = ComposeFile::from_configs(&bitcoin(&settings), &[]);
        assert_eq!(file.main_host_port(8332), Some(18000));
        assert_eq!(file.main_host_port(8333), Some(8333));
        assert_eq!(file.main_host_port(1234), None);
    }

    #[test]
    fn write_into_missing_directory_is_io_error() {
        let cwd = tempfile::tempdir().unwrap();
        let missing = cwd.path().join("nope");
        let config = bitcoin(&Settings::default());
        let err = create_compose_file("bitcoin-core", &missing, &config, &[]).unwrap_err();
        assert!(matches!(err, NodevinError::Io { .. }));
    }
}
