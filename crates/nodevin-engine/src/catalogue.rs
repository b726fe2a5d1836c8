// Network catalogue: a static table of every network nodevin can run and the
// compose configuration each one starts from.

use std::collections::BTreeMap;
use std::path::PathBuf;

use nodevin_common::constants::{labels, DEFAULT_VERSION, INIT_CONTAINER_PREFIX, MAIN_SERVICE};
use nodevin_common::{NodevinError, Result, Settings};
use nodevin_sdk::IOUtil;

use crate::network_config::{DependsOn, NetworkConfig, NetworkDef, VolumeDef};

/// Node software family behind a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Software {
    Bitcoin,
    Litecoin,
    Dogecoin,
    Ethereum,
    Ord,
    OrdLitecoin,
    Ipfs,
    IpfsCluster,
}

impl Software {
    pub fn as_str(&self) -> &'static str {
        match self {
            Software::Bitcoin => "bitcoin",
            Software::Litecoin => "litecoin",
            Software::Dogecoin => "dogecoin",
            Software::Ethereum => "ethereum",
            Software::Ord => "ord",
            Software::OrdLitecoin => "ord-litecoin",
            Software::Ipfs => "ipfs",
            Software::IpfsCluster => "ipfs-cluster",
        }
    }

    /// Whether the node answers `getblockcount` / `getconnectioncount`.
    pub fn has_chain_rpc(&self) -> bool {
        matches!(
            self,
            Software::Bitcoin | Software::Litecoin | Software::Dogecoin
        )
    }
}

/// How RPC credentials are appended to a node command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcAuth {
    /// `-rpcuser=<u> -rpcpassword=<p>`
    Core,
    /// `--<chain>-rpc-username <u> --<chain>-rpc-password <p> server`
    Ord {
        chain: &'static str,
        chain_data_path: &'static str,
    },
    None,
}

/// Companion services that can run next to a main chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion {
    Ord,
    OrdLitecoin,
    IpfsCluster,
}

impl Companion {
    pub fn flag(&self) -> &'static str {
        match self {
            Companion::Ord => "--ord",
            Companion::OrdLitecoin => "--ord-litecoin",
            Companion::IpfsCluster => "--ipfs-cluster",
        }
    }
}

/// Static facts about one catalogue key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub key: &'static str,
    pub software: Software,
    pub testnet: bool,
    pub image: &'static str,
    pub container_name: &'static str,
    /// Container-side RPC port, if the service exposes one.
    pub rpc_port: Option<u16>,
    pub auth: RpcAuth,
    /// Set for entries that only run as a companion of another chain.
    pub parent: Option<&'static str>,
    /// Rough on-disk size of a fully synced node, in GiB.
    pub assumed_size_gib: u64,
}

const ORD_BITCOIN: RpcAuth = RpcAuth::Ord {
    chain: "bitcoin",
    chain_data_path: "/node/bitcoin-core",
};
const ORD_LITECOIN: RpcAuth = RpcAuth::Ord {
    chain: "litecoin",
    chain_data_path: "/node/litecoin-core",
};

static NETWORKS: [NetworkSpec; 13] = [
    NetworkSpec {
        key: "bitcoin",
        software: Software::Bitcoin,
        testnet: false,
        image: "fiftysix/bitcoin-core",
        container_name: "bitcoin-core",
        rpc_port: Some(8332),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 650,
    },
    NetworkSpec {
        key: "bitcoin-testnet",
        software: Software::Bitcoin,
        testnet: true,
        image: "fiftysix/bitcoin-core",
        container_name: "bitcoin-core-testnet",
        rpc_port: Some(18332),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 200,
    },
    NetworkSpec {
        key: "litecoin",
        software: Software::Litecoin,
        testnet: false,
        image: "fiftysix/litecoin-core",
        container_name: "litecoin-core",
        rpc_port: Some(9332),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 200,
    },
    NetworkSpec {
        key: "litecoin-testnet",
        software: Software::Litecoin,
        testnet: true,
        image: "fiftysix/litecoin-core",
        container_name: "litecoin-core-testnet",
        rpc_port: Some(19332),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 40,
    },
    NetworkSpec {
        key: "dogecoin",
        software: Software::Dogecoin,
        testnet: false,
        image: "fiftysix/dogecoin-core",
        container_name: "dogecoin-core",
        rpc_port: Some(22555),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 100,
    },
    NetworkSpec {
        key: "dogecoin-testnet",
        software: Software::Dogecoin,
        testnet: true,
        image: "fiftysix/dogecoin-core",
        container_name: "dogecoin-core-testnet",
        rpc_port: Some(44555),
        auth: RpcAuth::Core,
        parent: None,
        assumed_size_gib: 20,
    },
    NetworkSpec {
        key: "ethereum",
        software: Software::Ethereum,
        testnet: false,
        image: "ethereum/client-go",
        container_name: "ethereum-node",
        rpc_port: Some(8545),
        auth: RpcAuth::None,
        parent: None,
        assumed_size_gib: 1300,
    },
    NetworkSpec {
        key: "ord",
        software: Software::Ord,
        testnet: false,
        image: "fiftysix/ord",
        container_name: "ord",
        rpc_port: Some(80),
        auth: ORD_BITCOIN,
        parent: Some("bitcoin"),
        assumed_size_gib: 150,
    },
    NetworkSpec {
        key: "ord-testnet",
        software: Software::Ord,
        testnet: true,
        image: "fiftysix/ord",
        container_name: "ord-testnet",
        rpc_port: Some(80),
        auth: ORD_BITCOIN,
        parent: Some("bitcoin-testnet"),
        assumed_size_gib: 50,
    },
    NetworkSpec {
        key: "ord-litecoin",
        software: Software::OrdLitecoin,
        testnet: false,
        image: "fiftysix/ord-litecoin",
        container_name: "ord-litecoin",
        rpc_port: Some(80),
        auth: ORD_LITECOIN,
        parent: Some("litecoin"),
        assumed_size_gib: 60,
    },
    NetworkSpec {
        key: "ord-litecoin-testnet",
        software: Software::OrdLitecoin,
        testnet: true,
        image: "fiftysix/ord-litecoin",
        container_name: "ord-litecoin-testnet",
        rpc_port: Some(80),
        auth: ORD_LITECOIN,
        parent: Some("litecoin-testnet"),
        assumed_size_gib: 20,
    },
    NetworkSpec {
        key: "ipfs",
        software: Software::Ipfs,
        testnet: false,
        image: "fiftysix/kubo",
        container_name: "ipfs-kubo",
        rpc_port: Some(5001),
        auth: RpcAuth::None,
        parent: None,
        assumed_size_gib: 0,
    },
    NetworkSpec {
        key: "ipfs-cluster",
        software: Software::IpfsCluster,
        testnet: false,
        image: "fiftysix/ipfs-cluster",
        container_name: "ipfs-cluster",
        rpc_port: Some(9094),
        auth: RpcAuth::None,
        parent: Some("ipfs"),
        assumed_size_gib: 0,
    },
];

/// Catalogue bound to a data root, so host paths can be made absolute.
#[derive(Debug, Clone)]
pub struct Catalogue {
    data_root: PathBuf,
}

impl Catalogue {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Every catalogue entry, in a stable order.
    pub fn specs() -> &'static [NetworkSpec] {
        &NETWORKS
    }

    /// Look up a catalogue key.
    pub fn spec(network: &str) -> Result<&'static NetworkSpec> {
        NETWORKS
            .iter()
            .find(|s| s.key == network)
            .ok_or_else(|| NodevinError::UnknownNetwork(network.to_string()))
    }

    /// Map a running container back to its catalogue entry.
    pub fn spec_by_container(container_name: &str) -> Option<&'static NetworkSpec> {
        let name = container_name.trim_start_matches('/');
        NETWORKS.iter().find(|s| s.container_name == name)
    }

    /// Resolve `<network>` plus `--testnet` to a catalogue key. Companion-only
    /// keys are accepted; see [`Catalogue::resolve_primary`] for the stricter form.
    pub fn resolve(network: &str, testnet: bool) -> Result<&'static NetworkSpec> {
        let spec = Self::spec(network)?;
        if !testnet || spec.testnet {
            return Ok(spec);
        }
        Self::spec(&format!("{network}-testnet")).map_err(|_| {
            NodevinError::UnsupportedNetwork(format!("{network} has no testnet variant"))
        })
    }

    /// Like [`Catalogue::resolve`] but rejects entries that only run as a companion.
    pub fn resolve_primary(network: &str, testnet: bool) -> Result<&'static NetworkSpec> {
        let spec = Self::resolve(network, testnet)?;
        if let Some(parent) = spec.parent {
            return Err(NodevinError::UnsupportedNetwork(format!(
                "{} runs as a companion of {parent}",
                spec.key
            )));
        }
        Ok(spec)
    }

    /// Catalogue entry of `companion` running next to `main`.
    pub fn companion_for(
        main: &NetworkSpec,
        companion: Companion,
    ) -> Result<&'static NetworkSpec> {
        let key = match (companion, main.software) {
            (Companion::Ord, Software::Bitcoin) => "ord",
            (Companion::OrdLitecoin, Software::Litecoin) => "ord-litecoin",
            (Companion::IpfsCluster, Software::Ipfs) => "ipfs-cluster",
            _ => {
                return Err(NodevinError::UnsupportedNetwork(format!(
                    "{} cannot run with {}",
                    companion.flag(),
                    main.key
                )))
            }
        };
        Self::resolve(key, main.testnet)
    }

    /// Default compose configuration for `network`, before auth and overrides.
    pub fn network_compose_config(&self, network: &str) -> Result<NetworkConfig> {
        let spec = Self::spec(network)?;
        Ok(self.base_config(spec))
    }

    /// Path under the data root for a container.
    fn local_path(&self, container_name: &str) -> String {
        self.data_root.join(container_name).to_string_lossy().into_owned()
    }

    fn base_config(&self, spec: &NetworkSpec) -> NetworkConfig {
        let local_path = self.local_path(spec.container_name);
        let mut cfg = match spec.key {
            "bitcoin" | "bitcoin-testnet" => core_chain(spec, "bitcoind", 8333, 18333),
            "litecoin" | "litecoin-testnet" => core_chain(spec, "litecoind", 9333, 19333),
            "dogecoin" | "dogecoin-testnet" => {
                let mut cfg = core_chain(spec, "dogecoind", 22556, 44556);
                // Dogecoin keeps its chain in a bind mount rather than a named volume.
                cfg.volumes = vec![format!("{local_path}:/node/dogecoin-core")];
                cfg.volume_defs.clear();
                cfg
            }
            "ethereum" => NetworkConfig {
                command: "geth --http --http.addr=0.0.0.0 --http.vhosts=*".to_string(),
                ports: vec!["8545:8545".to_string(), "30303:30303".to_string()],
                volumes: vec!["ethereum-node-data:/root/.ethereum".to_string()],
                networks: vec!["ethereum-net".to_string()],
                network_defs: net_def("ethereum-net"),
                volume_defs: software_volume("ethereum-node-data", "ethereum"),
                local_chain_data_path: "/root/.ethereum".to_string(),
                ..NetworkConfig::default()
            },
            "ord" | "ord-testnet" => ord(spec, "bitcoin-core", 8332, 18332, 80),
            "ord-litecoin" | "ord-litecoin-testnet" => {
                let mut cfg = ord(spec, "litecoin-core", 9332, 19332, 82);
                cfg.restart = "always".to_string();
                cfg
            }
            "ipfs" => NetworkConfig {
                ports: vec![
                    "4001:4001".to_string(),
                    "5001:5001".to_string(),
                    "8080:8080".to_string(),
                ],
                volumes: vec![format!("{local_path}:/data/ipfs")],
                networks: vec!["ipfs-net".to_string()],
                network_defs: net_def("ipfs-net"),
                local_chain_data_path: "/data/ipfs".to_string(),
                ..NetworkConfig::default()
            },
            _ => {
                let kubo = self.local_path("ipfs-kubo");
                NetworkConfig {
                    ports: vec!["9094:9094".to_string(), "9096:9096".to_string()],
                    volumes: vec![
                        format!("{kubo}:/data/ipfs:ro"),
                        format!("{local_path}:/data/ipfs-cluster"),
                    ],
                    networks: vec!["ipfs-net".to_string()],
                    network_defs: net_def("ipfs-net"),
                    environment: [
                        (
                            "CLUSTER_IPFSHTTP_NODEMULTIADDRESS",
                            "/dns4/ipfs-kubo/tcp/5001",
                        ),
                        (
                            "CLUSTER_RESTAPI_HTTPLISTENMULTIADDRESS",
                            "/ip4/0.0.0.0/tcp/9094",
                        ),
                    ]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                    depends_on: depends_on_main(),
                    local_chain_data_path: "/data/ipfs-cluster".to_string(),
                    ..NetworkConfig::default()
                }
            }
        };
        cfg.image = spec.image.to_string();
        cfg.version = DEFAULT_VERSION.to_string();
        cfg.container_name = spec.container_name.to_string();
        cfg.local_path = local_path;
        cfg.snapshot_data_filename = format!("{}-snapshot.tar.gz", spec.container_name);
        cfg
    }

    /// Final configuration of a main service: defaults, caller overrides and
    /// the RPC auth appendage.
    pub fn resolve_main(&self, spec: &NetworkSpec, settings: &Settings) -> NetworkConfig {
        let base = self.base_config(spec);
        let mut overrides = NetworkConfig::default();

        let mut command = base.command.clone();
        if !settings.args.trim().is_empty() && !command.is_empty() {
            command = format!("{command} {}", settings.args.trim());
        }
        overrides.command = finalize_command(&command, spec.auth, settings);

        if let (Some(port), Some(rpc_port)) = (settings.port, spec.rpc_port) {
            overrides.ports = remap_host_port(&base.ports, rpc_port, port);
        }
        if let Some(ref dir) = settings.data_dir {
            overrides.volumes = replace_chain_mount(&base.volumes, dir);
        }
        overrides.snapshot_sync_cid = settings.snapshot_cid.trim().to_string();

        let resources = &mut overrides.deploy.resources;
        resources.limits.cpus = settings.cpu_limit.clone();
        resources.limits.memory = settings.mem_limit.clone();
        resources.reservations.cpus = settings.cpu_reservation.clone();
        resources.reservations.memory = settings.mem_reservation.clone();

        base.merge(&overrides)
    }

    /// Final configuration of a companion started next to `main_spec`.
    pub fn resolve_companion(
        &self,
        spec: &NetworkSpec,
        main_spec: &NetworkSpec,
        settings: &Settings,
    ) -> NetworkConfig {
        let base = self.base_config(spec);
        let parent = self.base_config(main_spec);
        let mut overrides = NetworkConfig {
            command: finalize_command(&base.command, spec.auth, settings),
            ..NetworkConfig::default()
        };

        // A companion that shares the parent's chain mount follows --data-dir.
        if let Some(ref dir) = settings.data_dir {
            if base.chain_volume().is_some() && base.chain_volume() == parent.chain_volume() {
                overrides.volumes = replace_chain_mount(&base.volumes, dir);
            }
        }

        if spec.software == Software::IpfsCluster {
            let options = [
                ("CLUSTER_PEERNAME", &settings.ipfs_cluster_peername),
                ("CLUSTER_SECRET", &settings.ipfs_cluster_secret),
                ("CLUSTER_BOOTSTRAP", &settings.ipfs_cluster_bootstrap),
            ];
            for (key, value) in options {
                if !value.is_empty() {
                    overrides.environment.insert(key.to_string(), value.clone());
                }
            }
        }

        base.merge(&overrides)
    }

    /// Bootstrap service that downloads a chain snapshot into the main
    /// service's chain mount before the node starts.
    ///
    /// Fails with `CatalogueLookupFailed` when `main` carries no snapshot CID.
    pub fn snapshot_init_config(&self, main: &NetworkConfig) -> Result<NetworkConfig> {
        let cid = main.snapshot_sync_cid.as_str();
        if cid.is_empty() {
            return Err(NodevinError::CatalogueLookupFailed(format!(
                "no snapshot CID is known for {}; set snapshot-cid in config.yaml",
                main.container_name
            )));
        }
        let chain_mount = main.volumes.first().cloned().ok_or_else(|| {
            NodevinError::CatalogueLookupFailed(format!(
                "{} has no chain-data mount",
                main.container_name
            ))
        })?;

        let init_volume = format!("{INIT_CONTAINER_PREFIX}{}-data", main.container_name);
        let environment = [
            ("SNAPSHOT_CID", cid),
            ("SNAPSHOT_FILENAME", main.snapshot_data_filename.as_str()),
            ("CHAIN_DATA_PATH", main.local_chain_data_path.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Ok(NetworkConfig {
            image: "fiftysix/init-config".to_string(),
            version: DEFAULT_VERSION.to_string(),
            container_name: format!("{INIT_CONTAINER_PREFIX}{}", main.container_name),
            volumes: vec![chain_mount, format!("{init_volume}:/snapshot")],
            networks: main.networks.clone(),
            volume_defs: [(init_volume, VolumeDef::labelled(labels::INIT_VOLUME, "true"))]
                .into_iter()
                .collect(),
            environment,
            ..NetworkConfig::default()
        })
    }
}

/// Append credentials to a node command according to `auth`.
pub fn finalize_command(command: &str, auth: RpcAuth, settings: &Settings) -> String {
    match auth {
        RpcAuth::Core if settings.cookie_auth => command.to_string(),
        RpcAuth::Core => format!(
            "{command} -rpcuser={} -rpcpassword={}",
            settings.rpc_user, settings.rpc_pass
        ),
        RpcAuth::Ord {
            chain,
            chain_data_path,
        } if settings.cookie_auth => {
            format!("{command} --{chain}-data-dir {chain_data_path} server")
        }
        RpcAuth::Ord { chain, .. } => format!(
            "{command} --{chain}-rpc-username {} --{chain}-rpc-password {} server",
            settings.rpc_user, settings.rpc_pass
        ),
        RpcAuth::None => command.to_string(),
    }
}

/// Warning printed before starting a node with a large chain.
pub fn size_warning(spec: &NetworkSpec) -> Option<String> {
    if spec.assumed_size_gib == 0 {
        return None;
    }
    let bytes = spec.assumed_size_gib * 1024 * 1024 * 1024;
    Some(format!(
        "{} needs roughly {} of free disk space once fully synced",
        spec.key,
        IOUtil::format_size(bytes)
    ))
}

fn core_chain(spec: &NetworkSpec, daemon: &str, p2p_main: u16, p2p_test: u16) -> NetworkConfig {
    let rpc = spec.rpc_port.unwrap_or_default();
    let p2p = if spec.testnet { p2p_test } else { p2p_main };
    let family = spec.software.as_str();
    let suffix = if spec.testnet { "-testnet" } else { "" };
    let testnet_flag = if spec.testnet { "--testnet " } else { "" };
    let network = format!("{family}{suffix}-net");
    let volume = format!("{}-data", spec.container_name);
    let chain_path = format!("/node/{family}-core");

    NetworkConfig {
        command: format!(
            "{daemon} {testnet_flag}--server=1 --rpcbind=0.0.0.0 --rpcport={rpc} --rpcallowip=0.0.0.0/0"
        ),
        ports: vec![format!("{rpc}:{rpc}"), format!("{p2p}:{p2p}")],
        volumes: vec![format!("{volume}:{chain_path}")],
        networks: vec![network.clone()],
        network_defs: net_def(&network),
        volume_defs: software_volume(&volume, family),
        local_chain_data_path: chain_path,
        ..NetworkConfig::default()
    }
}

fn ord(
    spec: &NetworkSpec,
    chain_host: &str,
    rpc_main: u16,
    rpc_test: u16,
    host_port_main: u16,
) -> NetworkConfig {
    let (chain, chain_path) = match spec.auth {
        RpcAuth::Ord {
            chain,
            chain_data_path,
        } => (chain, chain_data_path),
        _ => ("bitcoin", "/node/bitcoin-core"),
    };
    let suffix = if spec.testnet { "-testnet" } else { "" };
    let rpc = if spec.testnet { rpc_test } else { rpc_main };
    let host_port = if spec.testnet { host_port_main + 1 } else { host_port_main };
    let testnet_flag = if spec.testnet { "--testnet " } else { "" };
    let parent_volume = format!("{chain_host}{suffix}-data");
    let network = format!("{chain}{suffix}-net");
    let ord_volume = format!("{}-data", spec.container_name);

    let mut volume_defs = software_volume(&parent_volume, chain);
    volume_defs.extend(software_volume(&ord_volume, spec.software.as_str()));

    NetworkConfig {
        command: format!(
            "ord {testnet_flag}--data-dir /node/ord --{chain}-rpc-url http://{chain_host}:{rpc}"
        ),
        ports: vec![format!("{host_port}:80")],
        volumes: vec![
            format!("{parent_volume}:{chain_path}"),
            format!("{ord_volume}:/node/ord"),
        ],
        networks: vec![network.clone()],
        network_defs: net_def(&network),
        volume_defs,
        depends_on: depends_on_main(),
        // The testnet chain container is reachable under the mainnet hostname.
        links: if spec.testnet {
            vec![format!("{MAIN_SERVICE}:{chain_host}")]
        } else {
            Vec::new()
        },
        local_chain_data_path: "/node/ord".to_string(),
        ..NetworkConfig::default()
    }
}

fn net_def(name: &str) -> BTreeMap<String, NetworkDef> {
    [(name.to_string(), NetworkDef::bridge())].into_iter().collect()
}

fn software_volume(name: &str, software: &str) -> BTreeMap<String, VolumeDef> {
    [(
        name.to_string(),
        VolumeDef::labelled(labels::BLOCKCHAIN_SOFTWARE, software),
    )]
    .into_iter()
    .collect()
}

fn depends_on_main() -> BTreeMap<String, DependsOn> {
    [(MAIN_SERVICE.to_string(), DependsOn::started())]
        .into_iter()
        .collect()
}

/// Replace the host side of the mapping whose container port is `container_port`.
fn remap_host_port(ports: &[String], container_port: u16, host_port: u16) -> Vec<String> {
    let target = container_port.to_string();
    ports
        .iter()
        .map(|mapping| match mapping.rsplit_once(':') {
            Some((_, container)) if container == target => format!("{host_port}:{container}"),
            _ => mapping.clone(),
        })
        .collect()
}

/// Replace the host side of the first (chain-data) mount with `host_dir`.
fn replace_chain_mount(volumes: &[String], host_dir: &str) -> Vec<String> {
    let mut out = volumes.to_vec();
    if let Some(first) = out.first_mut() {
        if let Some((_, rest)) = first.split_once(':') {
            *first = format!("{host_dir}:{rest}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> Catalogue {
        Catalogue::new("/home/u/.nodevin/data")
    }

    fn config(key: &str) -> NetworkConfig {
        catalogue().network_compose_config(key).unwrap()
    }

    #[test]
    fn every_key_has_image_container_and_ports() {
        for spec in Catalogue::specs() {
            let cfg = config(spec.key);
            assert!(!cfg.image.is_empty(), "{}", spec.key);
            assert!(!cfg.container_name.is_empty(), "{}", spec.key);
            assert!(!cfg.ports.is_empty(), "{}", spec.key);
        }
        assert_eq!(Catalogue::specs().len(), 13);
    }

    #[test]
    fn unknown_key_fails() {
        let err = catalogue().network_compose_config("solana").unwrap_err();
        assert_eq!(err.to_string(), "unknown network: solana");
    }

    #[test]
    fn container_names_are_unique() {
        let mut names: Vec<_> = Catalogue::specs().iter().map(|s| s.container_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Catalogue::specs().len());
    }

    #[test]
    fn testnets_differ_from_mainnet() {
        let pairs = [
            ("bitcoin", "bitcoin-testnet"),
            ("litecoin", "litecoin-testnet"),
            ("dogecoin", "dogecoin-testnet"),
            ("ord", "ord-testnet"),
            ("ord-litecoin", "ord-litecoin-testnet"),
        ];
        for (main, test) in pairs {
            let (m, t) = (config(main), config(test));
            assert_ne!(m.container_name, t.container_name, "{main}");
            assert_ne!(m.networks, t.networks, "{main}");
            assert_ne!(m.volumes, t.volumes, "{main}");
            assert!(m.ports.iter().any(|p| !t.ports.contains(p)), "{main}");
        }
    }

    #[test]
    fn bitcoin_defaults() {
        let cfg = config("bitcoin");
        assert_eq!(cfg.image, "fiftysix/bitcoin-core");
        assert_eq!(cfg.container_name, "bitcoin-core");
        assert_eq!(
            cfg.command,
            "bitcoind --server=1 --rpcbind=0.0.0.0 --rpcport=8332 --rpcallowip=0.0.0.0/0"
        );
        assert_eq!(cfg.ports, vec!["8332:8332", "8333:8333"]);
        assert_eq!(cfg.volumes, vec!["bitcoin-core-data:/node/bitcoin-core"]);
        assert_eq!(cfg.network_defs["bitcoin-net"].driver, "bridge");
        assert_eq!(
            cfg.volume_defs["bitcoin-core-data"].labels[labels::BLOCKCHAIN_SOFTWARE],
            "bitcoin"
        );
    }

    #[test]
    fn testnet_command_has_flag() {
        let cfg = config("litecoin-testnet");
        assert!(cfg.command.starts_with("litecoind --testnet --server=1"));
        assert!(cfg.command.contains("--rpcport=19332"));
        assert_eq!(cfg.ports, vec!["19332:19332", "19333:19333"]);
    }

    #[test]
    fn dogecoin_binds_local_path() {
        let cfg = config("dogecoin");
        assert_eq!(
            cfg.volumes,
            vec!["/home/u/.nodevin/data/dogecoin-core:/node/dogecoin-core"]
        );
        assert!(cfg.volume_defs.is_empty());
    }

    #[test]
    fn ord_reuses_parent_volume() {
        let cfg = config("ord");
        assert_eq!(cfg.volumes[0], "bitcoin-core-data:/node/bitcoin-core");
        assert_eq!(cfg.volumes[1], "ord-data:/node/ord");
        let testnet = config("ord-testnet");
        assert_eq!(testnet.volumes[0], "bitcoin-core-testnet-data:/node/bitcoin-core");
        assert_eq!(testnet.volumes[1], "ord-testnet-data:/node/ord");
        assert_eq!(config("ord-litecoin").restart, "always");
    }

    #[test]
    fn core_auth_is_appended_unless_cookie() {
        let catalogue = catalogue();
        let spec = Catalogue::spec("bitcoin").unwrap();
        let cfg = catalogue.resolve_main(spec, &Settings::default());
        assert!(cfg.command.ends_with("-rpcuser=user -rpcpassword=fiftysix"));

        let cookie = Settings {
            cookie_auth: true,
            ..Settings::default()
        };
        let cfg = catalogue.resolve_main(spec, &cookie);
        assert!(!cfg.command.contains("-rpcuser"));
    }

    #[test]
    fn every_rpc_command_ends_with_credentials() {
        let catalogue = catalogue();
        let settings = Settings::default();
        for spec in Catalogue::specs() {
            let cfg = match spec.parent {
                Some(parent) => {
                    let parent = Catalogue::spec(parent).unwrap();
                    catalogue.resolve_companion(spec, parent, &settings)
                }
                None => catalogue.resolve_main(spec, &settings),
            };
            match spec.auth {
                RpcAuth::Core => {
                    assert!(cfg.command.ends_with("-rpcuser=user -rpcpassword=fiftysix"))
                }
                RpcAuth::Ord { chain, .. } => assert!(cfg.command.ends_with(&format!(
                    "--{chain}-rpc-username user --{chain}-rpc-password fiftysix server"
                ))),
                RpcAuth::None => {}
            }
        }
    }

    #[test]
    fn ord_testnet_command() {
        let main = Catalogue::resolve("bitcoin", true).unwrap();
        let ord = Catalogue::companion_for(main, Companion::Ord).unwrap();
        assert_eq!(ord.key, "ord-testnet");
        let cfg = catalogue().resolve_companion(ord, main, &Settings::default());
        assert!(cfg.command.starts_with("ord --testnet "));
        assert!(cfg.command.ends_with(
            "--bitcoin-rpc-url http://bitcoin-core:18332 --bitcoin-rpc-username user --bitcoin-rpc-password fiftysix server"
        ));
        assert_eq!(cfg.links, vec!["main-service:bitcoin-core"]);
    }

    #[test]
    fn ord_cookie_mode_points_at_chain_data() {
        let main = Catalogue::spec("litecoin").unwrap();
        let ord = Catalogue::companion_for(main, Companion::OrdLitecoin).unwrap();
        let settings = Settings {
            cookie_auth: true,
            ..Settings::default()
        };
        let cfg = catalogue().resolve_companion(ord, main, &settings);
        assert!(cfg
            .command
            .ends_with("--litecoin-data-dir /node/litecoin-core server"));
    }

    #[test]
    fn caller_overrides_are_applied() {
        let settings = Settings {
            port: Some(18000),
            data_dir: Some("/mnt/btc".into()),
            args: "-txindex=1".into(),
            cpu_limit: "2".into(),
            mem_reservation: "1g".into(),
            ..Settings::default()
        };
        let spec = Catalogue::spec("bitcoin").unwrap();
        let cfg = catalogue().resolve_main(spec, &settings);
        assert_eq!(cfg.ports, vec!["18000:8332", "8333:8333"]);
        assert_eq!(cfg.volumes, vec!["/mnt/btc:/node/bitcoin-core"]);
        assert!(cfg
            .command
            .ends_with("--rpcallowip=0.0.0.0/0 -txindex=1 -rpcuser=user -rpcpassword=fiftysix"));
        assert_eq!(cfg.deploy.resources.limits.cpus, "2");
        assert_eq!(cfg.deploy.resources.reservations.memory, "1g");

        let ord = Catalogue::spec("ord").unwrap();
        let ord_cfg = catalogue().resolve_companion(ord, spec, &settings);
        assert_eq!(ord_cfg.volumes[0], "/mnt/btc:/node/bitcoin-core");
    }

    #[test]
    fn ipfs_cluster_environment_from_settings() {
        let main = Catalogue::spec("ipfs").unwrap();
        let cluster = Catalogue::companion_for(main, Companion::IpfsCluster).unwrap();
        let settings = Settings {
            ipfs_cluster_peername: "peer-a".into(),
            ..Settings::default()
        };
        let cfg = catalogue().resolve_companion(cluster, main, &settings);
        assert_eq!(cfg.environment["CLUSTER_PEERNAME"], "peer-a");
        assert!(!cfg.environment.contains_key("CLUSTER_SECRET"));
        assert_eq!(
            cfg.volumes[0],
            "/home/u/.nodevin/data/ipfs-kubo:/data/ipfs:ro"
        );
    }

    #[test]
    fn key_resolution() {
        assert_eq!(Catalogue::resolve("bitcoin", true).unwrap().key, "bitcoin-testnet");
        assert_eq!(
            Catalogue::resolve("bitcoin-testnet", true).unwrap().key,
            "bitcoin-testnet"
        );
        assert!(matches!(
            Catalogue::resolve("ethereum", true),
            Err(NodevinError::UnsupportedNetwork(_))
        ));
        assert!(matches!(
            Catalogue::resolve_primary("ord", false),
            Err(NodevinError::UnsupportedNetwork(_))
        ));
        let eth = Catalogue::spec("ethereum").unwrap();
        assert!(Catalogue::companion_for(eth, Companion::Ord).is_err());
    }

    #[test]
    fn spec_by_container_strips_slash() {
        assert_eq!(
            Catalogue::spec_by_container("/bitcoin-core").map(|s| s.key),
            Some("bitcoin")
        );
        assert!(Catalogue::spec_by_container("postgres").is_none());
    }

    #[test]
    fn snapshot_requires_cid() {
        let catalogue = catalogue();
        let spec = Catalogue::spec("bitcoin").unwrap();
        let main = catalogue.resolve_main(spec, &Settings::default());
        assert_eq!(main.snapshot_sync_cid, "");
        let err = catalogue.snapshot_init_config(&main).unwrap_err();
        assert!(matches!(err, NodevinError::CatalogueLookupFailed(_)));

        let settings = Settings {
            snapshot_cid: " bafyexample ".into(),
            ..Settings::default()
        };
        let main = catalogue.resolve_main(spec, &settings);
        assert_eq!(main.snapshot_sync_cid, "bafyexample");
        let init = catalogue.snapshot_init_config(&main).unwrap();
        assert_eq!(init.container_name, "init-config-bitcoin-core");
        assert_eq!(init.environment["SNAPSHOT_CID"], "bafyexample");
        assert_eq!(
            init.environment["SNAPSHOT_FILENAME"],
            "bitcoin-core-snapshot.tar.gz"
        );
        let (volume, def) = init.volume_defs.iter().next().unwrap();
        assert_eq!(volume, "init-config-bitcoin-core-data");
        assert_eq!(def.labels[labels::INIT_VOLUME], "true");
    }

    #[test]
    fn size_warning_only_for_chains() {
        assert!(size_warning(Catalogue::spec("bitcoin").unwrap())
            .unwrap()
            .contains("650.0 GiB"));
        assert!(size_warning(Catalogue::spec("ipfs").unwrap()).is_none());
    }
}
