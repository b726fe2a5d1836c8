// Command-line surface of the `nodevin` binary.

use clap::{Args, Parser, Subcommand};

use nodevin_common::SettingsOverrides;
use nodevin_engine::Companion;

#[derive(Parser, Debug)]
#[command(
    name = "nodevin",
    version,
    about = "Run and manage blockchain full nodes in containers"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command; they override `config.yaml` and the
/// `NODEVIN_*` environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Host port for the node's RPC interface.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Host directory to keep chain data in instead of the managed volume.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Extra arguments appended to the node command.
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub args: Option<String>,

    #[arg(long = "cpu-limit", global = true)]
    pub cpu_limit: Option<String>,

    #[arg(long = "mem-limit", global = true)]
    pub mem_limit: Option<String>,

    #[arg(long = "cpu-reservation", global = true)]
    pub cpu_reservation: Option<String>,

    #[arg(long = "mem-reservation", global = true)]
    pub mem_reservation: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a node (and optional companion services).
    Start(StartArgs),
    /// Stop a node, or every container with `all`.
    Stop(NetworkArgs),
    /// Recreate a node's containers from its compose file.
    Restart(NetworkArgs),
    /// Stop a node and delete its chain data (`all` deletes every node's data).
    Delete(NetworkArgs),
    /// Open a shell inside a node's container.
    Shell(ShellArgs),
    /// Show a node's logs.
    Logs(LogsArgs),
    /// Archive a volume to `<dest>/backup.tar.gz`.
    Backup {
        volume: String,
        dest: String,
    },
    /// Show running nodes, sync progress and disk usage.
    Info {
        network: Option<String>,
        #[arg(long)]
        testnet: bool,
    },
    /// List supported networks.
    List,
    /// Send a JSON-RPC request to a node.
    Request(RequestArgs),
    /// Update nodevin itself, or with `docker` the node images.
    Update {
        #[command(subcommand)]
        target: Option<UpdateTarget>,
    },
    /// Create the data directory and a default config.yaml.
    Init,
    /// Background updater.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Remove a node's image, or every nodevin image with `all`.
    RemoveImage(NetworkArgs),
    /// Remove every nodevin image.
    Cleanup,
    /// Print version information.
    Version,
    /// IPFS helpers.
    Ipfs {
        #[command(subcommand)]
        action: IpfsAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Network name, e.g. `bitcoin`, or `all`.
    pub network: String,
    #[arg(long)]
    pub testnet: bool,
}

/// Credentials shared by `start` and `request`.
#[derive(Args, Debug, Clone, Default)]
pub struct RpcCredentialArgs {
    #[arg(long = "rpc-user")]
    pub rpc_user: Option<String>,
    #[arg(long = "rpc-pass")]
    pub rpc_pass: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    pub network: String,
    #[arg(long)]
    pub testnet: bool,
    /// Run the Ord indexer next to Bitcoin.
    #[arg(long)]
    pub ord: bool,
    /// Run the Ord indexer next to Litecoin.
    #[arg(long = "ord-litecoin")]
    pub ord_litecoin: bool,
    /// Run IPFS Cluster next to IPFS.
    #[arg(long = "ipfs-cluster")]
    pub ipfs_cluster: bool,
    /// Bootstrap chain data from a snapshot before the node starts.
    #[arg(long = "snapshot-sync")]
    pub snapshot_sync: bool,
    /// Use cookie authentication instead of user/password.
    #[arg(long = "cookie-auth")]
    pub cookie_auth: bool,
    #[command(flatten)]
    pub credentials: RpcCredentialArgs,
}

impl StartArgs {
    pub fn companions(&self) -> Vec<Companion> {
        [
            (self.ord, Companion::Ord),
            (self.ord_litecoin, Companion::OrdLitecoin),
            (self.ipfs_cluster, Companion::IpfsCluster),
        ]
        .into_iter()
        .filter_map(|(set, companion)| set.then_some(companion))
        .collect()
    }
}

#[derive(Args, Debug, Clone)]
pub struct ShellArgs {
    pub network: String,
    #[arg(long)]
    pub testnet: bool,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub workdir: Option<String>,
    /// `KEY=VALUE`; may be repeated.
    #[arg(long)]
    pub env: Vec<String>,
    #[arg(long = "env-file")]
    pub env_file: Option<String>,
    #[arg(long)]
    pub privileged: bool,
    /// Run in the background instead of attaching.
    #[arg(short = 'd', long)]
    pub detach: bool,
    /// Command to run instead of `/bin/sh`.
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    pub network: String,
    #[arg(long)]
    pub testnet: bool,
    #[arg(short = 'f', long)]
    pub follow: bool,
    /// Number of lines from the end, or `all`.
    #[arg(long)]
    pub tail: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    pub network: String,
    #[arg(long)]
    pub testnet: bool,
    #[arg(short = 'm', long)]
    pub method: String,
    /// JSON params, e.g. `[800000]`.
    #[arg(short = 'p', long)]
    pub params: Option<String>,
    /// Extra headers as `key:value,key:value`.
    #[arg(short = 'H', long)]
    pub header: Option<String>,
    /// Base URL of the node, default `http://127.0.0.1`.
    #[arg(short = 'e', long)]
    pub endpoint: Option<String>,
    #[command(flatten)]
    pub credentials: RpcCredentialArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UpdateTarget {
    /// Pull newer node images and recreate their containers.
    Docker,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DaemonAction {
    Start {
        /// Run in the background.
        #[arg(short = 'd', long)]
        detach: bool,
    },
    Stop,
    Logs {
        #[arg(long)]
        tail: Option<usize>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum IpfsAction {
    /// Pin a network's snapshot on the local IPFS node.
    Support { network: String },
}

impl Cli {
    /// Command-line layer of the settings.
    pub fn overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            port: self.global.port,
            data_dir: self.global.data_dir.clone(),
            args: self.global.args.clone(),
            cpu_limit: self.global.cpu_limit.clone(),
            mem_limit: self.global.mem_limit.clone(),
            cpu_reservation: self.global.cpu_reservation.clone(),
            mem_reservation: self.global.mem_reservation.clone(),
            ..SettingsOverrides::default()
        };
        let credentials = match self.command {
            Command::Start(ref start) => {
                if start.cookie_auth {
                    overrides.cookie_auth = Some(true);
                }
                Some(&start.credentials)
            }
            Command::Request(ref request) => Some(&request.credentials),
            _ => None,
        };
        if let Some(credentials) = credentials {
            overrides.rpc_user = credentials.rpc_user.clone();
            overrides.rpc_pass = credentials.rpc_pass.clone();
        }
        overrides
    }
}
