// Command dispatch: resolves settings once, builds the engine pieces a
// command needs and prints user-facing output to stdout.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nodevin_common::constants::{paths, return_code, RUNTIME_PROGRAM};
use nodevin_common::{logging, DataDirectory, HttpClientFactory, Settings};
use nodevin_engine::info::render_table;
use nodevin_engine::lifecycle::list_networks;
use nodevin_engine::request::{self, RpcRequest};
use nodevin_engine::{
    check_runtime_available, Catalogue, DockerCommandManager, DockerHubDigestSource, ExecOptions,
    HttpChainProbe, ImageUpdater, InfoAggregator, LifecycleController, StartRequest, StopOutcome,
    Target,
};
use nodevin_sdk::{NodevinPackage, Source};

use crate::cli::{Cli, Command, DaemonAction, IpfsAction, UpdateTarget};
use crate::daemon::{self, Daemon};
use crate::self_updater::{SelfUpdater, UpdateOutcome};

/// Install the logger that fits `command`: the dual stdout/file writer for a
/// foreground daemon, stderr for everything else.
pub fn init_logging(command: &Command) -> Result<()> {
    match command {
        Command::Daemon {
            action: DaemonAction::Start { detach: false },
        } => logging::init_daemon(Path::new(paths::DAEMON_LOG_FILE))?,
        _ => logging::init_cli(),
    }
    Ok(())
}

/// Run one CLI invocation and return the process exit code.
pub async fn execute(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let overrides = cli.overrides();

    match cli.command {
        Command::Version => {
            println!(
                "{} {} (commit {})",
                NodevinPackage::BINARY_NAME,
                NodevinPackage::VERSION,
                Source::COMMIT_HASH
            );
        }
        Command::List => {
            println!("{}", render_table(&list_networks()));
        }
        Command::Init => init(&cwd)?,
        Command::Daemon { action } => return run_daemon(action, &cwd).await,
        Command::Update { target: None } => {
            let updater = SelfUpdater::new(HttpClientFactory::create_client()?, &cwd);
            match updater.run().await? {
                UpdateOutcome::UpToDate(tag) => println!("nodevin is up to date ({tag})"),
                UpdateOutcome::Installed { version, path } => println!(
                    "Installed nodevin {version} at {}; restart nodevin to use it",
                    path.display()
                ),
            }
        }
        Command::Update {
            target: Some(UpdateTarget::Docker),
        } => {
            check_runtime_available(RUNTIME_PROGRAM)?;
            let report = image_updater(&cwd)?.run_pass().await?;
            println!(
                "Updated: {}, up to date: {}, skipped: {}, failed: {}",
                report.updated.len(),
                report.current.len(),
                report.skipped.len(),
                report.failed.len()
            );
            if !report.failed.is_empty() {
                return Ok(return_code::TERMINATED_ERROR);
            }
        }
        Command::Request(args) => {
            let settings = Settings::load(&cwd, &overrides)?;
            let spec = Catalogue::resolve(&args.network, args.testnet)?;
            let (rpc_user, rpc_pass) = if settings.cookie_auth {
                (None, None)
            } else {
                (Some(settings.rpc_user.clone()), Some(settings.rpc_pass.clone()))
            };
            let rpc = RpcRequest {
                method: args.method,
                params: args.params,
                headers: match args.header {
                    Some(ref raw) => request::parse_headers(raw)?,
                    None => Vec::new(),
                },
                endpoint: args.endpoint,
                port: settings.port,
                rpc_user,
                rpc_pass,
            };
            let client = HttpClientFactory::create_local_client()?;
            let body = request::send(&client, spec, &rpc).await?;
            println!("{body}");
        }
        command => {
            let settings = Settings::load(&cwd, &overrides)?;
            return run_node_command(command, &cwd, settings).await;
        }
    }
    Ok(return_code::SUCCESS)
}

/// Commands that need the container runtime and the data directory.
async fn run_node_command(command: Command, cwd: &Path, settings: Settings) -> Result<i32> {
    check_runtime_available(RUNTIME_PROGRAM)?;
    let data_dir = DataDirectory::resolve()?;
    let docker = DockerCommandManager::system();

    if let Command::Info { network, testnet } = command {
        let only = network
            .as_deref()
            .map(|n| Catalogue::resolve(n, testnet))
            .transpose()?;
        let credentials = (!settings.cookie_auth)
            .then(|| (settings.rpc_user.clone(), settings.rpc_pass.clone()));
        let probe = HttpChainProbe::new(
            HttpClientFactory::create_local_client()?,
            HttpClientFactory::create_client()?,
            credentials,
        );
        let report = InfoAggregator::new(docker, Arc::new(probe), data_dir, cwd)
            .collect(only)
            .await?;
        print!("{}", report.render());
        return Ok(return_code::SUCCESS);
    }

    let controller = LifecycleController::new(docker, data_dir, cwd, settings);
    match command {
        Command::Start(args) => {
            let request = StartRequest {
                companions: args.companions(),
                network: args.network,
                testnet: args.testnet,
                snapshot_sync: args.snapshot_sync,
            };
            let report = controller.start(&request).await?;
            println!(
                "Started {} from {}",
                request.network,
                report.compose_file.display()
            );
        }
        Command::Stop(args) => {
            let target = Target::parse(&args.network, args.testnet)?;
            match controller.stop(target).await? {
                StopOutcome::NothingRunning => {
                    println!("No running containers found for {}", args.network)
                }
                StopOutcome::Stopped(n) => println!("Stopped {n} container(s)"),
            }
        }
        Command::Restart(args) => {
            let Target::Network(spec) = Target::parse(&args.network, args.testnet)? else {
                anyhow::bail!("restart needs a single network, not `all`");
            };
            controller.restart(spec).await?;
            println!("Restarted {}", spec.key);
        }
        Command::Delete(args) => {
            let target = Target::parse(&args.network, args.testnet)?;
            if controller.delete(target).await? {
                println!("Deleted chain data for {}", args.network);
            } else {
                println!("No chain data found for {}", args.network);
            }
        }
        Command::Shell(args) => {
            let spec = Catalogue::resolve(&args.network, args.testnet)?;
            let options = ExecOptions {
                user: args.user,
                workdir: args.workdir,
                env: args.env,
                env_file: args.env_file,
                privileged: args.privileged,
                detach: args.detach,
                command: args.command,
            };
            return Ok(controller.shell(spec, &options).await?);
        }
        Command::Logs(args) => {
            let spec = Catalogue::resolve(&args.network, args.testnet)?;
            return Ok(controller
                .logs(spec, args.follow, args.tail.as_deref())
                .await?);
        }
        Command::Backup { volume, dest } => {
            let archive = controller.backup(&volume, Path::new(&dest)).await?;
            println!("Backup written to {}", archive.display());
        }
        Command::RemoveImage(args) => {
            let removed = controller
                .remove_image(Target::parse(&args.network, args.testnet)?)
                .await?;
            print_removed(&removed);
        }
        Command::Cleanup => print_removed(&controller.cleanup().await?),
        Command::Ipfs {
            action: IpfsAction::Support { network },
        } => {
            let spec = Catalogue::resolve_primary(&network, false)?;
            let cid = controller.ipfs_support(spec).await?;
            println!("Pinned {cid} for {}", spec.key);
        }
        other => anyhow::bail!("unexpected command {other:?}"),
    }
    Ok(return_code::SUCCESS)
}

fn print_removed(images: &[String]) {
    if images.is_empty() {
        println!("No nodevin images to remove");
    }
    for image in images {
        println!("Removed {image}");
    }
}

fn init(cwd: &Path) -> Result<()> {
    let data_dir = DataDirectory::resolve()?;
    println!("Data directory: {}", data_dir.root().display());
    let config = cwd.join(paths::CONFIG_FILE);
    if config.exists() {
        println!("{} already exists, leaving it untouched", config.display());
        return Ok(());
    }
    std::fs::write(&config, Settings::default_file_contents())
        .with_context(|| format!("Failed to write {}", config.display()))?;
    println!("Wrote {}", config.display());
    Ok(())
}

fn image_updater(cwd: &Path) -> Result<ImageUpdater> {
    let digests = DockerHubDigestSource::new(HttpClientFactory::create_client()?);
    Ok(ImageUpdater::new(
        DockerCommandManager::system(),
        Arc::new(digests),
        cwd,
    ))
}

async fn run_daemon(action: DaemonAction, cwd: &Path) -> Result<i32> {
    let pid_file = PathBuf::from(paths::DAEMON_PID_FILE);
    let log_file = PathBuf::from(paths::DAEMON_LOG_FILE);
    match action {
        DaemonAction::Start { detach: true } => {
            let pid = daemon::detach(&log_file)?;
            println!(
                "Daemon started in the background (PID {pid}), logging to {}",
                log_file.display()
            );
        }
        DaemonAction::Start { detach: false } => {
            check_runtime_available(RUNTIME_PROGRAM)?;
            if let Some(pid) = daemon::read_pid_file(&pid_file)? {
                tracing::warn!("PID file names process {pid}; replacing it");
            }
            daemon::write_pid_file(&pid_file, std::process::id())?;
            let updater = SelfUpdater::new(HttpClientFactory::create_client()?, cwd);
            let daemon = Daemon::new(Arc::new(updater), Arc::new(image_updater(cwd)?));
            let shutdown = tokio_util::sync::CancellationToken::new();
            daemon::spawn_signal_handler(shutdown.clone());
            daemon.run(shutdown).await;
            daemon::remove_pid_file(&pid_file)?;
        }
        DaemonAction::Stop => {
            if daemon::stop(&pid_file)? {
                println!("Daemon stopped");
            } else {
                println!("No daemon is running");
            }
        }
        DaemonAction::Logs { tail } => print!("{}", daemon::read_log(&log_file, tail)?),
    }
    Ok(return_code::SUCCESS)
}
