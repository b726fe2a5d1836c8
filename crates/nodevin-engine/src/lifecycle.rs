// LifecycleController: start/stop/restart/delete and the other per-node
// operations, expressed as runtime argv through DockerCommandManager.

use std::path::{Path, PathBuf};
use tabled::Tabled;

use nodevin_common::constants::{
    Architecture, CURRENT_ARCHITECTURE, INIT_SERVICE, MANAGED_IMAGE_PREFIX,
};
use nodevin_common::{DataDirectory, NodevinError, Result, Settings};

use crate::catalogue::{size_warning, Catalogue, Companion, NetworkSpec, Software};
use crate::compose::{compose_file_path, create_compose_file};
use crate::container::{DockerCommandManager, ExecOptions};
use crate::network_config::{DependsOn, NetworkConfig};
use crate::reaper::{ReapReport, Reaper};

/// Container the IPFS (Kubo) node runs in.
const IPFS_CONTAINER: &str = "ipfs-kubo";
const BACKUP_IMAGE: &str = "alpine";
const BACKUP_ARCHIVE: &str = "backup.tar.gz";
const WRITE_CHECK_FILE: &str = ".nodevin-write-check";

/// What `start` should bring up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    pub network: String,
    pub testnet: bool,
    pub companions: Vec<Companion>,
    pub snapshot_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub compose_file: PathBuf,
    pub warnings: Vec<String>,
    pub reaped: ReapReport,
}

/// A single network or every managed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Network(&'static NetworkSpec),
}

impl Target {
    /// `all` or a primary network key (plus `--testnet`).
    pub fn parse(network: &str, testnet: bool) -> Result<Self> {
        if network == "all" {
            return Ok(Target::All);
        }
        Ok(Target::Network(Catalogue::resolve_primary(network, testnet)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running; informational, not an error.
    NothingRunning,
    Stopped(usize),
}

/// Row of `nodevin list`.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct NetworkRow {
    pub network: String,
    pub image: String,
    pub container: String,
}

pub struct LifecycleController {
    docker: DockerCommandManager,
    catalogue: Catalogue,
    data_dir: DataDirectory,
    cwd: PathBuf,
    settings: Settings,
    architecture: Architecture,
}

impl LifecycleController {
    pub fn new(
        docker: DockerCommandManager,
        data_dir: DataDirectory,
        cwd: impl Into<PathBuf>,
        settings: Settings,
    ) -> Self {
        Self {
            docker,
            catalogue: Catalogue::new(data_dir.root()),
            data_dir,
            cwd: cwd.into(),
            settings,
            architecture: CURRENT_ARCHITECTURE,
        }
    }

    /// Override the detected CPU architecture.
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Start a node and its companions.
    ///
    /// Order: catalogue lookup, companion image pull, descriptor write,
    /// `compose up -d`, then the init-artifact reaper.
    pub async fn start(&self, request: &StartRequest) -> Result<StartReport> {
        let main_spec = Catalogue::resolve_primary(&request.network, request.testnet)?;
        let mut companion_specs = Vec::with_capacity(request.companions.len());
        for companion in &request.companions {
            let spec = Catalogue::companion_for(main_spec, *companion)?;
            if spec.software == Software::Ord && self.architecture == Architecture::Arm64 {
                return Err(NodevinError::UnsupportedPlatform(format!(
                    "{} images are not published for {}",
                    spec.key, self.architecture
                )));
            }
            companion_specs.push(spec);
        }

        let mut main = self.catalogue.resolve_main(main_spec, &self.settings);
        let mut services: Vec<(String, NetworkConfig)> = companion_specs
            .iter()
            .map(|spec| {
                let cfg = self
                    .catalogue
                    .resolve_companion(spec, main_spec, &self.settings);
                (spec.key.to_string(), cfg)
            })
            .collect();
        if request.snapshot_sync {
            let init = self.catalogue.snapshot_init_config(&main)?;
            main.depends_on
                .insert(INIT_SERVICE.to_string(), DependsOn::completed());
            services.push((INIT_SERVICE.to_string(), init));
        }

        for spec in std::iter::once(main_spec).chain(companion_specs.iter().copied()) {
            self.data_dir.ensure_network(spec.container_name)?;
        }

        let warnings: Vec<String> = std::iter::once(main_spec)
            .chain(companion_specs.iter().copied())
            .filter_map(size_warning)
            .collect();
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        for (name, cfg) in &services {
            if name == INIT_SERVICE {
                continue;
            }
            tracing::info!("Pulling {}", cfg.tagged_image());
            self.docker.pull(&cfg.tagged_image()).await?;
        }

        let compose_file =
            create_compose_file(main_spec.container_name, &self.cwd, &main, &services)?;
        self.docker.compose_up(&compose_file).await?;
        tracing::info!("Started {}", main_spec.key);

        let reaped = Reaper::new(self.docker.clone()).reap().await;
        Ok(StartReport {
            compose_file,
            warnings,
            reaped,
        })
    }

    pub async fn stop(&self, target: Target) -> Result<StopOutcome> {
        match target {
            Target::All => {
                let ids = self.docker.all_container_ids().await?;
                if ids.is_empty() {
                    tracing::info!("No containers are running");
                    return Ok(StopOutcome::NothingRunning);
                }
                self.docker.stop_containers(&ids).await?;
                self.docker.remove_containers(&ids, false).await?;
                tracing::info!("Stopped and removed {} containers", ids.len());
                Ok(StopOutcome::Stopped(ids.len()))
            }
            Target::Network(spec) => {
                let file = compose_file_path(&self.cwd, spec.container_name);
                if !file.is_file() {
                    tracing::info!("{} is not running (no {})", spec.key, file.display());
                    return Ok(StopOutcome::NothingRunning);
                }
                let ids = self.docker.compose_ps_ids(&file).await?;
                if ids.is_empty() {
                    tracing::info!("{} is not running", spec.key);
                    return Ok(StopOutcome::NothingRunning);
                }
                self.docker.compose_down(&file).await?;
                tracing::info!("Stopped {}", spec.key);
                Ok(StopOutcome::Stopped(ids.len()))
            }
        }
    }

    /// `down` then `up -d` on the descriptor written by `start`.
    pub async fn restart(&self, spec: &NetworkSpec) -> Result<()> {
        let file = self.existing_compose_file(spec)?;
        self.docker.compose_down(&file).await?;
        self.docker.compose_up(&file).await?;
        tracing::info!("Restarted {}", spec.key);
        Ok(())
    }

    /// Stop the target, then remove its data directory (the whole data root
    /// for `all`). Returns whether anything was removed from disk.
    pub async fn delete(&self, target: Target) -> Result<bool> {
        self.stop(target).await?;
        let removed = match target {
            Target::All => self.data_dir.remove_all()?,
            Target::Network(spec) => self.data_dir.remove_network(spec.container_name)?,
        };
        if removed {
            tracing::info!("Removed chain data");
        } else {
            tracing::info!("No chain data to remove");
        }
        Ok(removed)
    }

    /// Exit code of the shell session.
    pub async fn shell(&self, spec: &NetworkSpec, options: &ExecOptions) -> Result<i32> {
        self.docker.exec(spec.container_name, options).await
    }

    pub async fn logs(&self, spec: &NetworkSpec, follow: bool, tail: Option<&str>) -> Result<i32> {
        self.docker.logs(spec.container_name, follow, tail).await
    }

    /// Tar the contents of `volume` into `<dest>/backup.tar.gz` using an
    /// ephemeral helper container.
    pub async fn backup(&self, volume: &str, dest: &Path) -> Result<PathBuf> {
        if !self.docker.volume_exists(volume).await? {
            return Err(NodevinError::VolumeNotFound(volume.to_string()));
        }

        let dest = if dest.is_absolute() {
            dest.to_path_buf()
        } else {
            self.cwd.join(dest)
        };
        std::fs::create_dir_all(&dest).map_err(|e| NodevinError::io(&dest, e))?;
        ensure_writable(&dest)?;

        let args = vec![
            "-v".to_string(),
            format!("{volume}:/node-data:ro"),
            "-v".to_string(),
            format!("{}:/backup", dest.display()),
            BACKUP_IMAGE.to_string(),
            "tar".to_string(),
            "-czf".to_string(),
            format!("/backup/{BACKUP_ARCHIVE}"),
            "-C".to_string(),
            "/node-data".to_string(),
            ".".to_string(),
        ];
        let output = self.docker.run_ephemeral(args).await?;
        if !output.success() {
            let detail = if output.stderr.trim().is_empty() {
                format!("exit code {}", output.exit_code)
            } else {
                output.stderr.trim().to_string()
            };
            return Err(NodevinError::BackupFailed(detail));
        }
        let archive = dest.join(BACKUP_ARCHIVE);
        tracing::info!("Backed up {volume} to {}", archive.display());
        Ok(archive)
    }

    /// Remove every image in the managed namespace.
    pub async fn cleanup(&self) -> Result<Vec<String>> {
        let images: Vec<String> = self
            .docker
            .list_images()
            .await?
            .into_iter()
            .filter(|image| image.starts_with(MANAGED_IMAGE_PREFIX) && !image.ends_with(":<none>"))
            .collect();
        if images.is_empty() {
            tracing::info!("No nodevin images to remove");
            return Ok(images);
        }
        self.docker.remove_images(&images).await?;
        tracing::info!("Removed {} images", images.len());
        Ok(images)
    }

    pub async fn remove_image(&self, target: Target) -> Result<Vec<String>> {
        match target {
            Target::All => self.cleanup().await,
            Target::Network(spec) => {
                let image = self
                    .catalogue
                    .network_compose_config(spec.key)?
                    .tagged_image();
                self.docker.remove_images(&[image.clone()]).await?;
                tracing::info!("Removed {image}");
                Ok(vec![image])
            }
        }
    }

    /// Pin the snapshot of `spec` on the running IPFS node.
    pub async fn ipfs_support(&self, spec: &NetworkSpec) -> Result<String> {
        let cid = self
            .catalogue
            .resolve_main(spec, &self.settings)
            .snapshot_sync_cid;
        if cid.is_empty() {
            return Err(NodevinError::CatalogueLookupFailed(format!(
                "no snapshot CID is known for {}; set snapshot-cid in config.yaml",
                spec.key
            )));
        }
        self.docker
            .exec_captured(IPFS_CONTAINER, &["ipfs", "pin", "add", &cid])
            .await?;
        tracing::info!("Pinned {cid} for {}", spec.key);
        Ok(cid)
    }

    fn existing_compose_file(&self, spec: &NetworkSpec) -> Result<PathBuf> {
        let file = compose_file_path(&self.cwd, spec.container_name);
        if file.is_file() {
            return Ok(file);
        }
        Err(NodevinError::io(
            &file,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no compose file; run `nodevin start {}` first", spec.key),
            ),
        ))
    }
}

/// Every catalogue entry, for `nodevin list`.
pub fn list_networks() -> Vec<NetworkRow> {
    Catalogue::specs()
        .iter()
        .map(|spec| NetworkRow {
            network: spec.key.to_string(),
            image: spec.image.to_string(),
            container: spec.container_name.to_string(),
        })
        .collect()
}

/// Create and remove a scratch file in `dir` to confirm it accepts writes.
fn ensure_writable(dir: &Path) -> Result<()> {
    let scratch = dir.join(WRITE_CHECK_FILE);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&scratch)
    {
        Ok(_) => std::fs::remove_file(&scratch).map_err(|e| NodevinError::io(&scratch, e)),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(
            NodevinError::PermissionDenied(format!("'{}' is not writable", dir.display())),
        ),
        Err(e) => Err(NodevinError::io(&scratch, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::ScriptedRunner;
    use nodevin_sdk::ProcessOutput;
    use std::sync::Arc;

    struct Fixture {
        runner: Arc<ScriptedRunner>,
        cwd: tempfile::TempDir,
        home: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                runner: ScriptedRunner::new(),
                cwd: tempfile::tempdir().unwrap(),
                home: tempfile::tempdir().unwrap(),
            }
        }

        fn data_root(&self) -> PathBuf {
            self.home.path().join(".nodevin/data")
        }

        fn controller(&self, settings: Settings) -> LifecycleController {
            let data_dir = DataDirectory::new(self.data_root());
            data_dir.ensure_root().unwrap();
            LifecycleController::new(
                DockerCommandManager::new(self.runner.clone()),
                data_dir,
                self.cwd.path(),
                settings,
            )
            .with_architecture(Architecture::X64)
        }

        fn compose_file(&self, container: &str) -> String {
            self.cwd
                .path()
                .join(format!("docker-compose_{container}.yml"))
                .display()
                .to_string()
        }
    }

    fn start(network: &str) -> StartRequest {
        StartRequest {
            network: network.to_string(),
            ..StartRequest::default()
        }
    }

    #[tokio::test]
    async fn start_writes_descriptor_then_ups_then_reaps() {
        let fx = Fixture::new();
        let report = fx
            .controller(Settings::default())
            .start(&start("bitcoin"))
            .await
            .unwrap();

        let file = fx.compose_file("bitcoin-core");
        assert_eq!(report.compose_file.display().to_string(), file);
        assert!(report.compose_file.is_file());
        assert_eq!(report.warnings.len(), 1);
        assert!(fx.data_root().join("bitcoin-core").is_dir());

        let calls = fx.runner.joined_calls();
        assert_eq!(calls[0], format!("compose -f {file} up -d"));
        assert!(calls[1].starts_with("ps -a --filter name=init-config-"));
        assert!(calls.iter().all(|c| !c.starts_with("pull")));
    }

    #[tokio::test]
    async fn start_with_ord_pulls_companion_first() {
        let fx = Fixture::new();
        let request = StartRequest {
            network: "bitcoin".into(),
            testnet: true,
            companions: vec![Companion::Ord],
            snapshot_sync: false,
        };
        let report = fx
            .controller(Settings::default())
            .start(&request)
            .await
            .unwrap();

        let calls = fx.runner.joined_calls();
        assert_eq!(calls[0], "pull fiftysix/ord:latest");
        assert_eq!(
            calls[1],
            format!("compose -f {} up -d", fx.compose_file("bitcoin-core-testnet"))
        );
        let yaml = std::fs::read_to_string(report.compose_file).unwrap();
        assert!(yaml.contains("ord-testnet:"));
        assert!(yaml.contains("main-service:"));
    }

    #[tokio::test]
    async fn ord_on_arm64_is_refused_before_anything_happens() {
        let fx = Fixture::new();
        let request = StartRequest {
            network: "bitcoin".into(),
            companions: vec![Companion::Ord],
            ..StartRequest::default()
        };
        let err = fx
            .controller(Settings::default())
            .with_architecture(Architecture::Arm64)
            .start(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::UnsupportedPlatform(_)));
        assert!(fx.runner.calls().is_empty());
        assert!(!Path::new(&fx.compose_file("bitcoin-core")).exists());
    }

    #[tokio::test]
    async fn companion_flag_must_match_parent() {
        let fx = Fixture::new();
        let request = StartRequest {
            network: "ethereum".into(),
            companions: vec![Companion::Ord],
            ..StartRequest::default()
        };
        let err = fx
            .controller(Settings::default())
            .start(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::UnsupportedNetwork(_)));
    }

    #[tokio::test]
    async fn snapshot_sync_needs_a_cid() {
        let fx = Fixture::new();
        let request = StartRequest {
            network: "bitcoin".into(),
            snapshot_sync: true,
            ..StartRequest::default()
        };
        let err = fx
            .controller(Settings::default())
            .start(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::CatalogueLookupFailed(_)));
        assert!(fx.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn snapshot_sync_adds_init_service() {
        let fx = Fixture::new();
        let settings = Settings {
            snapshot_cid: "bafyexample".into(),
            ..Settings::default()
        };
        let request = StartRequest {
            network: "bitcoin".into(),
            snapshot_sync: true,
            ..StartRequest::default()
        };
        let report = fx.controller(settings).start(&request).await.unwrap();
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(report.compose_file).unwrap()).unwrap();
        let init = &yaml["services"]["init-config"];
        assert_eq!(init["container_name"].as_str(), Some("init-config-bitcoin-core"));
        assert_eq!(
            yaml["services"]["main-service"]["depends_on"]["init-config"]["condition"].as_str(),
            Some("service_completed_successfully")
        );
        // The init image is never pulled separately.
        assert!(fx.runner.joined_calls().iter().all(|c| !c.starts_with("pull")));
    }

    #[tokio::test]
    async fn stop_short_circuits_when_nothing_runs() {
        let fx = Fixture::new();
        let controller = fx.controller(Settings::default());
        let target = Target::parse("bitcoin", false).unwrap();

        // No descriptor at all.
        assert_eq!(controller.stop(target).await.unwrap(), StopOutcome::NothingRunning);
        assert!(fx.runner.calls().is_empty());

        // Descriptor present, but `ps -q` is empty.
        std::fs::write(fx.compose_file("bitcoin-core"), "version: '3.9'\n").unwrap();
        assert_eq!(controller.stop(target).await.unwrap(), StopOutcome::NothingRunning);
        assert_eq!(
            fx.runner.joined_calls(),
            vec![format!("compose -f {} ps -q", fx.compose_file("bitcoin-core"))]
        );
    }

    #[tokio::test]
    async fn stop_runs_down_when_containers_exist() {
        let fx = Fixture::new();
        let file = fx.compose_file("bitcoin-core");
        std::fs::write(&file, "version: '3.9'\n").unwrap();
        fx.runner.on(&["compose", "-f", &file, "ps"], ProcessOutput::ok("abc\n"));
        let outcome = fx
            .controller(Settings::default())
            .stop(Target::parse("bitcoin", false).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, StopOutcome::Stopped(1));
        assert_eq!(
            fx.runner.joined_calls(),
            vec![format!("compose -f {file} ps -q"), format!("compose -f {file} down")]
        );
    }

    #[tokio::test]
    async fn stop_all_stops_then_removes_everything() {
        let fx = Fixture::new();
        fx.runner.on(&["ps", "-aq"], ProcessOutput::ok("a1\nb2\n"));
        let outcome = fx
            .controller(Settings::default())
            .stop(Target::All)
            .await
            .unwrap();
        assert_eq!(outcome, StopOutcome::Stopped(2));
        assert_eq!(fx.runner.joined_calls(), vec!["ps -aq", "stop a1 b2", "rm a1 b2"]);
    }

    #[tokio::test]
    async fn compose_down_failure_surfaces() {
        let fx = Fixture::new();
        let file = fx.compose_file("litecoin-core");
        std::fs::write(&file, "version: '3.9'\n").unwrap();
        fx.runner.on(&["compose", "-f", &file, "ps"], ProcessOutput::ok("abc\n"));
        fx.runner
            .on(&["compose", "-f", &file, "down"], ProcessOutput::failed(1, "boom"));
        let err = fx
            .controller(Settings::default())
            .stop(Target::parse("litecoin", false).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::ComposeDownFailed(_)));
    }

    #[tokio::test]
    async fn restart_is_down_then_up() {
        let fx = Fixture::new();
        let controller = fx.controller(Settings::default());
        let spec = Catalogue::spec("dogecoin").unwrap();
        assert!(controller.restart(spec).await.is_err());

        let file = fx.compose_file("dogecoin-core");
        std::fs::write(&file, "version: '3.9'\n").unwrap();
        controller.restart(spec).await.unwrap();
        assert_eq!(
            fx.runner.joined_calls(),
            vec![format!("compose -f {file} down"), format!("compose -f {file} up -d")]
        );
    }

    #[tokio::test]
    async fn delete_all_removes_data_root_only() {
        let fx = Fixture::new();
        let sibling = fx.home.path().join(".nodevin/keep.txt");
        let controller = fx.controller(Settings::default());
        std::fs::write(&sibling, "x").unwrap();
        std::fs::create_dir_all(fx.data_root().join("bitcoin-core/blocks")).unwrap();

        assert!(controller.delete(Target::All).await.unwrap());
        assert!(!fx.data_root().exists());
        assert!(sibling.exists());
        assert_eq!(fx.runner.joined_calls(), vec!["ps -aq"]);
    }

    #[tokio::test]
    async fn delete_network_removes_its_directory() {
        let fx = Fixture::new();
        let controller = fx.controller(Settings::default());
        std::fs::create_dir_all(fx.data_root().join("litecoin-core")).unwrap();
        std::fs::create_dir_all(fx.data_root().join("bitcoin-core")).unwrap();

        let removed = controller
            .delete(Target::parse("litecoin", false).unwrap())
            .await
            .unwrap();
        assert!(removed);
        assert!(!fx.data_root().join("litecoin-core").exists());
        assert!(fx.data_root().join("bitcoin-core").exists());
    }

    #[tokio::test]
    async fn shell_and_logs_target_the_container_name() {
        let fx = Fixture::new();
        let controller = fx.controller(Settings::default());
        let spec = Catalogue::spec("bitcoin-testnet").unwrap();
        let options = ExecOptions {
            user: Some("root".into()),
            ..ExecOptions::default()
        };
        assert_eq!(controller.shell(spec, &options).await.unwrap(), 0);
        controller.logs(spec, true, Some("100")).await.unwrap();
        assert_eq!(
            fx.runner.joined_calls(),
            vec![
                "exec -it --user root bitcoin-core-testnet /bin/sh",
                "logs -f --tail 100 bitcoin-core-testnet",
            ]
        );
    }

    #[tokio::test]
    async fn backup_requires_existing_volume() {
        let fx = Fixture::new();
        fx.runner
            .on(&["volume", "inspect"], ProcessOutput::failed(1, "no such volume"));
        let err = fx
            .controller(Settings::default())
            .backup("nope", fx.cwd.path())
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::VolumeNotFound(_)));
    }

    #[tokio::test]
    async fn backup_runs_ephemeral_tar() {
        let fx = Fixture::new();
        let dest = fx.cwd.path().join("backups");
        let archive = fx
            .controller(Settings::default())
            .backup("bitcoin-core-data", &dest)
            .await
            .unwrap();
        assert_eq!(archive, dest.join("backup.tar.gz"));
        assert!(dest.is_dir());
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
        let calls = fx.runner.joined_calls();
        assert_eq!(calls[0], "volume inspect bitcoin-core-data");
        assert_eq!(
            calls[1],
            format!(
                "run --rm -v bitcoin-core-data:/node-data:ro -v {}:/backup alpine tar -czf /backup/backup.tar.gz -C /node-data .",
                dest.display()
            )
        );
    }

    #[test]
    fn write_check_rejects_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = ensure_writable(&missing).unwrap_err();
        assert!(!matches!(err, NodevinError::PermissionDenied(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn write_check_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), "x").unwrap();
        ensure_writable(dir.path()).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("keep.txt")]);
    }

    #[tokio::test]
    async fn backup_failure_is_reported() {
        let fx = Fixture::new();
        fx.runner.on(&["run"], ProcessOutput::failed(2, "tar: write error"));
        let err = fx
            .controller(Settings::default())
            .backup("bitcoin-core-data", fx.cwd.path())
            .await
            .unwrap_err();
        match err {
            NodevinError::BackupFailed(msg) => assert!(msg.contains("tar: write error")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cleanup_removes_only_managed_images() {
        let fx = Fixture::new();
        fx.runner.on(
            &["images"],
            ProcessOutput::ok(concat!(
                "fiftysix/bitcoin-core:latest\n",
                "ethereum/client-go:latest\n",
                "fiftysix/ord:<none>\n",
                "fiftysix/kubo:0.29\n",
            )),
        );
        let removed = fx.controller(Settings::default()).cleanup().await.unwrap();
        assert_eq!(removed, vec!["fiftysix/bitcoin-core:latest", "fiftysix/kubo:0.29"]);
        assert_eq!(
            fx.runner.joined_calls().last().unwrap(),
            "rmi fiftysix/bitcoin-core:latest fiftysix/kubo:0.29"
        );
    }

    #[tokio::test]
    async fn cleanup_with_no_images_runs_no_rmi() {
        let fx = Fixture::new();
        let removed = fx.controller(Settings::default()).cleanup().await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(fx.runner.joined_calls(), vec!["images --format {{.Repository}}:{{.Tag}}"]);
    }

    #[tokio::test]
    async fn remove_image_for_one_network() {
        let fx = Fixture::new();
        fx.controller(Settings::default())
            .remove_image(Target::parse("litecoin", true).unwrap())
            .await
            .unwrap();
        assert_eq!(fx.runner.joined_calls(), vec!["rmi fiftysix/litecoin-core:latest"]);
    }

    #[tokio::test]
    async fn ipfs_support_pins_snapshot_cid() {
        let fx = Fixture::new();
        let spec = Catalogue::spec("bitcoin").unwrap();
        let err = fx
            .controller(Settings::default())
            .ipfs_support(spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NodevinError::CatalogueLookupFailed(_)));

        let settings = Settings {
            snapshot_cid: "bafyexample".into(),
            ..Settings::default()
        };
        let cid = fx.controller(settings).ipfs_support(spec).await.unwrap();
        assert_eq!(cid, "bafyexample");
        assert_eq!(fx.runner.joined_calls(), vec!["exec ipfs-kubo ipfs pin add bafyexample"]);
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse("all", false).unwrap(), Target::All);
        match Target::parse("bitcoin", true).unwrap() {
            Target::Network(spec) => assert_eq!(spec.container_name, "bitcoin-core-testnet"),
            Target::All => panic!("expected a network"),
        }
        assert!(matches!(
            Target::parse("solana", false),
            Err(NodevinError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn list_covers_catalogue() {
        let rows = list_networks();
        assert_eq!(rows.len(), Catalogue::specs().len());
        assert!(rows.iter().any(|r| r.network == "ipfs" && r.container == "ipfs-kubo"));
    }
}
