// Info aggregator: reconciles running containers with node RPC, global
// height oracles and on-disk usage into a status report.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::settings::object::{Rows, Segment};
use tabled::settings::{Alignment, Format, Padding, Style};
use tabled::{Table, Tabled};

use nodevin_common::constants::{paths, NODE_VERSION_ENV};
use nodevin_common::{DataDirectory, Result};
use nodevin_sdk::IOUtil;

use crate::catalogue::{Catalogue, NetworkSpec};
use crate::compose::ComposeFile;
use crate::container::{compact_ports, ContainerInfo, DockerCommandManager};
use crate::probe::ChainProbe;

const NOT_APPLICABLE: &str = "-";

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct NodeRow {
    pub blockchain: String,
    pub version: String,
    pub command: String,
    pub status: String,
    pub ports: String,
    pub peers: String,
    #[tabled(rename = "latest local/global")]
    pub latest: String,
}

/// Aggregated per-container data behind a [`NodeRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub network: String,
    pub name: String,
    pub uptime_days: Option<i64>,
    pub peers: u64,
    pub latest_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct DataDirRow {
    pub network: String,
    pub size: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoReport {
    pub rows: Vec<NodeRow>,
    pub nodes: Vec<NodeData>,
    pub data: Vec<DataDirRow>,
}

impl InfoReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.rows.is_empty() {
            out.push_str("No running nodes found.\n");
        } else {
            out.push_str(&render_table(&self.rows));
            out.push('\n');
        }
        out.push_str("\nData directories:\n");
        if self.data.is_empty() {
            out.push_str("(none)\n");
        } else {
            out.push_str(&render_table(&self.data));
            out.push('\n');
        }
        out
    }
}

/// Plain left-aligned table with upper-case headers.
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::empty())
        .modify(Segment::all(), Padding::new(0, 4, 0, 0))
        .modify(Segment::all(), Alignment::left())
        .modify(Rows::first(), Format::content(|s| s.to_uppercase()));
    table.to_string()
}

pub struct InfoAggregator {
    docker: DockerCommandManager,
    probe: Arc<dyn ChainProbe>,
    data_dir: DataDirectory,
    cwd: PathBuf,
}

impl InfoAggregator {
    pub fn new(
        docker: DockerCommandManager,
        probe: Arc<dyn ChainProbe>,
        data_dir: DataDirectory,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            docker,
            probe,
            data_dir,
            cwd: cwd.into(),
        }
    }

    /// Build the report, optionally restricted to one network.
    pub async fn collect(&self, only: Option<&NetworkSpec>) -> Result<InfoReport> {
        let containers = self.docker.list_containers(false).await?;
        let mut report = InfoReport::default();

        for container in containers.iter().filter(|c| c.is_managed()) {
            let spec = Catalogue::spec_by_container(container.name());
            if let Some(only) = only {
                if spec.map(|s| s.key) != Some(only.key) {
                    continue;
                }
            }
            let (row, node) = self.inspect(container, spec).await;
            report.rows.push(row);
            report.nodes.push(node);
        }

        report.data = self
            .data_dir
            .usage()
            .into_iter()
            .filter(|u| only.map_or(true, |s| s.container_name == u.network))
            .map(|u| DataDirRow {
                network: u.network,
                size: IOUtil::format_size(u.bytes),
                path: u.path.display().to_string(),
            })
            .collect();
        Ok(report)
    }

    async fn inspect(
        &self,
        container: &ContainerInfo,
        spec: Option<&'static NetworkSpec>,
    ) -> (NodeRow, NodeData) {
        let name = container.name().to_string();
        let version = self.version_of(container).await;
        let mut peers_cell = NOT_APPLICABLE.to_string();
        let mut latest_cell = NOT_APPLICABLE.to_string();
        let mut peers = 0;
        let mut latest_block = 0;

        if let Some(spec) = spec.filter(|s| s.software.has_chain_rpc()) {
            let port = self.rpc_host_port(spec);
            peers = self.probe.rpc_number(port, "getconnectioncount").await;
            latest_block = self.probe.rpc_number(port, "getblockcount").await;
            let global = self.probe.global_height(spec.software, spec.testnet).await;
            peers_cell = peers.to_string();
            latest_cell = format!("{latest_block}/{global}");
        }

        let row = NodeRow {
            blockchain: name.clone(),
            version,
            command: container.command.trim_matches('"').to_string(),
            status: container.status.clone(),
            ports: compact_ports(&container.ports),
            peers: peers_cell,
            latest: latest_cell,
        };
        let node = NodeData {
            network: spec
                .map(|s| s.key.to_string())
                .unwrap_or_else(|| container.display_image().to_string()),
            name,
            uptime_days: container.uptime_days(Utc::now()),
            peers,
            latest_block,
        };
        (row, node)
    }

    /// Image tag, or the `NODE_VERSION` the image publishes when tagged `latest`.
    async fn version_of(&self, container: &ContainerInfo) -> String {
        let (_, tag) = container.image_and_tag();
        if tag != "latest" {
            return tag.to_string();
        }
        match self.docker.container_env(&container.id).await {
            Ok(env) => env
                .iter()
                .find_map(|e| e.strip_prefix(&format!("{NODE_VERSION_ENV}=")).map(str::to_string))
                .unwrap_or_else(|| tag.to_string()),
            Err(e) => {
                tracing::debug!("Could not inspect {}: {e}", container.id);
                tag.to_string()
            }
        }
    }

    /// RPC host port from the compose descriptor in the working directory,
    /// falling back to the catalogue default.
    fn rpc_host_port(&self, spec: &NetworkSpec) -> u16 {
        let default = spec.rpc_port.unwrap_or_default();
        let path = self.cwd.join(paths::compose_file_name(spec.container_name));
        if !path.exists() {
            return default;
        }
        match ComposeFile::load(&path) {
            Ok(file) => file.main_host_port(default).unwrap_or(default),
            Err(e) => {
                tracing::debug!("Ignoring unreadable descriptor '{}': {e}", path.display());
                default
            }
        }
    }
}
