use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Everything a captured child process wrote, plus its exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Build a successful output with the given stdout. Mostly useful for fakes.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Build a failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty, trimmed stdout lines.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Spawns child processes with an explicit argv.
///
/// Two modes are supported: `execute` pipes stdout/stderr and returns them once
/// the process exits, `execute_attached` lets the child inherit the terminal
/// (interactive shells, followed logs).
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Execute `file_name` with `arguments` and capture its output. A non-zero
    /// exit is returned in [`ProcessOutput::exit_code`]; only a failure to
    /// spawn or wait is an error.
    pub async fn execute(&self, file_name: &str, arguments: &[String]) -> Result<ProcessOutput> {
        anyhow::ensure!(!file_name.is_empty(), "file_name must not be empty");
        let joined = arguments.join(" ");
        tracing::debug!(target: "process", "Starting process: {file_name} {joined}");

        let mut cmd = Command::new(file_name);
        cmd.args(arguments);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().with_context(|| {
            format!("Failed to start process '{file_name}' with arguments '{joined}'")
        })?;
        let pid = child.id().unwrap_or(0);

        let stdout = child.stdout.take();
        let stdout_task = tokio::spawn(async move {
            let mut collected = Vec::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push(line);
                }
            }
            collected
        });

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut collected = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push(line);
                }
            }
            collected
        });

        let status = child
            .wait()
            .await
            .context("Failed to wait for process")?;
        let exit_code = status.code().unwrap_or(-1);

        let stdout = stdout_task.await.unwrap_or_default().join("\n");
        let stderr = stderr_task.await.unwrap_or_default().join("\n");

        tracing::debug!(
            target: "process",
            "Finished process {pid} with exit code {exit_code}, and elapsed time {:.2?}.",
            start.elapsed()
        );

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Execute `file_name` with the terminal attached and return its exit code.
    pub async fn execute_attached(&self, file_name: &str, arguments: &[String]) -> Result<i32> {
        anyhow::ensure!(!file_name.is_empty(), "file_name must not be empty");
        let joined = arguments.join(" ");
        tracing::debug!(target: "process", "Attaching to process: {file_name} {joined}");

        let mut cmd = Command::new(file_name);
        cmd.args(arguments);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd.stdin(Stdio::inherit());

        let status = cmd
            .status()
            .await
            .with_context(|| format!("Failed to run '{file_name}' with arguments '{joined}'"))?;
        Ok(status.code().unwrap_or(-1))
    }
}
