// DockerCommandManager: every runtime argv nodevin issues, built in one place
// and executed through a CommandRunner.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use nodevin_common::constants::RUNTIME_PROGRAM;
use nodevin_common::{NodevinError, Result};
use nodevin_sdk::{CommandRunner, ProcessOutput, SystemCommandRunner};

use crate::container::container_info::ContainerInfo;

/// Fail with `RuntimeUnavailable` unless `program` resolves on `PATH`.
pub fn check_runtime_available(program: &str) -> Result<()> {
    which::which(program)
        .map(|path| tracing::debug!(target: "docker", "Using runtime at '{}'", path.display()))
        .map_err(|e| {
            NodevinError::RuntimeUnavailable(format!("'{program}' not found on PATH: {e}"))
        })
}

/// Options forwarded to `docker exec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub user: Option<String>,
    pub workdir: Option<String>,
    pub env: Vec<String>,
    pub env_file: Option<String>,
    pub privileged: bool,
    pub detach: bool,
    /// Command to run; `/bin/sh` when empty.
    pub command: Vec<String>,
}

#[derive(Deserialize)]
struct InspectedContainer {
    #[serde(rename = "Config", default)]
    config: InspectedConfig,
}

#[derive(Deserialize, Default)]
struct InspectedConfig {
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct InspectedImage {
    #[serde(rename = "RepoDigests", default)]
    repo_digests: Option<Vec<String>>,
}

fn to_args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// Manages Docker CLI operations.
#[derive(Clone)]
pub struct DockerCommandManager {
    runner: Arc<dyn CommandRunner>,
}

impl DockerCommandManager {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Manager backed by the real `docker` binary.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemCommandRunner::new(RUNTIME_PROGRAM)))
    }

    // -----------------------------------------------------------------------
    // Compose
    // -----------------------------------------------------------------------

    pub async fn compose_up(&self, file: &Path) -> Result<()> {
        let args = compose_args(file, &["up", "-d"]);
        self.run_checked(args, NodevinError::ComposeUpFailed).await?;
        Ok(())
    }

    pub async fn compose_down(&self, file: &Path) -> Result<()> {
        let args = compose_args(file, &["down"]);
        self.run_checked(args, NodevinError::ComposeDownFailed).await?;
        Ok(())
    }

    /// IDs of the containers the descriptor currently has running.
    pub async fn compose_ps_ids(&self, file: &Path) -> Result<Vec<String>> {
        let args = compose_args(file, &["ps", "-q"]);
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(output.stdout_lines())
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    /// `docker ps`, optionally including stopped containers.
    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        let mut args = to_args(["ps"]);
        if all {
            args.push("-a".to_string());
        }
        args.extend(to_args(["--format", "{{json .}}"]));
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(ContainerInfo::parse_lines(&output.stdout))
    }

    /// Containers (including stopped) whose name matches `name_filter`.
    pub async fn list_containers_named(&self, name_filter: &str) -> Result<Vec<ContainerInfo>> {
        let args = to_args([
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("name={name_filter}"),
            "--format".to_string(),
            "{{json .}}".to_string(),
        ]);
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(ContainerInfo::parse_lines(&output.stdout))
    }

    /// IDs of every container known to the runtime.
    pub async fn all_container_ids(&self) -> Result<Vec<String>> {
        let output = self
            .run_checked(to_args(["ps", "-aq"]), NodevinError::RuntimeExecFailed)
            .await?;
        Ok(output.stdout_lines())
    }

    pub async fn stop_containers(&self, ids: &[String]) -> Result<()> {
        let mut args = to_args(["stop"]);
        args.extend(ids.iter().cloned());
        self.run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(())
    }

    pub async fn remove_containers(&self, ids: &[String], force: bool) -> Result<()> {
        let mut args = to_args(["rm"]);
        if force {
            args.push("-f".to_string());
        }
        args.extend(ids.iter().cloned());
        self.run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(())
    }

    /// `Config.Env` of a container.
    pub async fn container_env(&self, id: &str) -> Result<Vec<String>> {
        let output = self
            .run_checked(to_args(["inspect", id]), NodevinError::RuntimeExecFailed)
            .await?;
        let inspected: Vec<InspectedContainer> = serde_json::from_str(&output.stdout)?;
        Ok(inspected
            .into_iter()
            .next()
            .and_then(|c| c.config.env)
            .unwrap_or_default())
    }

    /// `docker exec` into `container`, attached unless `options.detach`.
    pub async fn exec(&self, container: &str, options: &ExecOptions) -> Result<i32> {
        let args = exec_args(container, options);
        if options.detach {
            let output = self
                .run_checked(args, NodevinError::RuntimeExecFailed)
                .await?;
            return Ok(output.exit_code);
        }
        self.run_attached(args).await
    }

    /// Run a command in `container` and capture its output.
    pub async fn exec_captured(&self, container: &str, command: &[&str]) -> Result<ProcessOutput> {
        let mut args = to_args(["exec", container]);
        args.extend(to_args(command.iter().copied()));
        self.run_checked(args, NodevinError::RuntimeExecFailed)
            .await
    }

    /// Stream `docker logs` to the terminal.
    pub async fn logs(&self, container: &str, follow: bool, tail: Option<&str>) -> Result<i32> {
        let args = logs_args(container, follow, tail);
        self.run_attached(args).await
    }

    /// `docker run --rm ...` with the given arguments after `run --rm`.
    pub async fn run_ephemeral(&self, rest: Vec<String>) -> Result<ProcessOutput> {
        let mut args = to_args(["run", "--rm"]);
        args.extend(rest);
        self.run(args).await
    }

    // -----------------------------------------------------------------------
    // Images
    // -----------------------------------------------------------------------

    pub async fn pull(&self, image: &str) -> Result<()> {
        self.run_checked(to_args(["pull", image]), NodevinError::PullFailed)
            .await?;
        Ok(())
    }

    /// First `RepoDigests` entry of a local image, e.g. `fiftysix/ord@sha256:...`.
    pub async fn image_repo_digest(&self, image: &str) -> Result<Option<String>> {
        let output = self
            .run_checked(
                to_args(["image", "inspect", image]),
                NodevinError::RuntimeExecFailed,
            )
            .await?;
        let inspected: Vec<InspectedImage> = serde_json::from_str(&output.stdout)?;
        Ok(inspected
            .into_iter()
            .next()
            .and_then(|i| i.repo_digests)
            .and_then(|d| d.into_iter().next()))
    }

    /// Every local image as `repository:tag`.
    pub async fn list_images(&self) -> Result<Vec<String>> {
        let args = to_args(["images", "--format", "{{.Repository}}:{{.Tag}}"]);
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(output.stdout_lines())
    }

    pub async fn remove_images(&self, images: &[String]) -> Result<()> {
        let mut args = to_args(["rmi"]);
        args.extend(images.iter().cloned());
        self.run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Volumes
    // -----------------------------------------------------------------------

    /// Names of volumes matching a `--filter` expression.
    pub async fn list_volumes(&self, filter: &str) -> Result<Vec<String>> {
        let args = to_args(["volume", "ls", "--filter", filter, "--format", "{{.Name}}"]);
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(output.stdout_lines())
    }

    pub async fn volume_exists(&self, name: &str) -> Result<bool> {
        let output = self.run(to_args(["volume", "inspect", name])).await?;
        Ok(output.success())
    }

    pub async fn volume_created_at(&self, name: &str) -> Result<String> {
        let args = to_args(["volume", "inspect", name, "--format", "{{.CreatedAt}}"]);
        let output = self
            .run_checked(args, NodevinError::RuntimeExecFailed)
            .await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn remove_volume(&self, name: &str) -> Result<()> {
        self.run_checked(to_args(["volume", "rm", name]), NodevinError::RuntimeExecFailed)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn run(&self, args: Vec<String>) -> Result<ProcessOutput> {
        tracing::debug!(target: "docker", "{} {}", self.runner.program(), args.join(" "));
        self.runner.output(&args).await.map_err(|e| {
            let program = self.runner.program();
            NodevinError::RuntimeExecFailed(format!("{program} {}: {e:#}", args.join(" ")))
        })
    }

    /// Run and map a non-zero exit to `kind`, carrying stderr.
    async fn run_checked(
        &self,
        args: Vec<String>,
        kind: fn(String) -> NodevinError,
    ) -> Result<ProcessOutput> {
        let joined = args.join(" ");
        let output = self.run(args).await?;
        if !output.success() {
            let detail = if output.stderr.trim().is_empty() {
                format!("exit code {}", output.exit_code)
            } else {
                output.stderr.trim().to_string()
            };
            tracing::error!(
                target: "docker",
                "{} {} exited with code {}: {}",
                self.runner.program(),
                joined,
                output.exit_code,
                detail
            );
            return Err(kind(format!("{} {joined}: {detail}", self.runner.program())));
        }
        Ok(output)
    }

    async fn run_attached(&self, args: Vec<String>) -> Result<i32> {
        tracing::debug!(target: "docker", "{} {}", self.runner.program(), args.join(" "));
        self.runner.attached(&args).await.map_err(|e| {
            let program = self.runner.program();
            NodevinError::RuntimeExecFailed(format!("{program} {}: {e:#}", args.join(" ")))
        })
    }
}

fn compose_args(file: &Path, rest: &[&str]) -> Vec<String> {
    let mut args = vec![
        "compose".to_string(),
        "-f".to_string(),
        file.to_string_lossy().into_owned(),
    ];
    args.extend(to_args(rest.iter().copied()));
    args
}

fn exec_args(container: &str, options: &ExecOptions) -> Vec<String> {
    let mut args = to_args(["exec"]);
    args.push(if options.detach { "-d" } else { "-it" }.to_string());
    if let Some(ref user) = options.user {
        args.extend(to_args(["--user", user.as_str()]));
    }
    if let Some(ref workdir) = options.workdir {
        args.extend(to_args(["--workdir", workdir.as_str()]));
    }
    for env in &options.env {
        args.extend(to_args(["--env", env.as_str()]));
    }
    if let Some(ref env_file) = options.env_file {
        args.extend(to_args(["--env-file", env_file.as_str()]));
    }
    if options.privileged {
        args.push("--privileged".to_string());
    }
    args.push(container.to_string());
    if options.command.is_empty() {
        args.push("/bin/sh".to_string());
    } else {
        args.extend(options.command.iter().cloned());
    }
    args
}

fn logs_args(container: &str, follow: bool, tail: Option<&str>) -> Vec<String> {
    let mut args = to_args(["logs"]);
    if follow {
        args.push("-f".to_string());
    }
    if let Some(tail) = tail {
        args.extend(to_args(["--tail", tail]));
    }
    args.push(container.to_string());
    args
}
