use anyhow::Result;
use async_trait::async_trait;

use crate::process_invoker::{ProcessInvoker, ProcessOutput};

/// Seam between nodevin and the external container runtime CLI.
///
/// Every docker interaction goes through this trait so higher layers can be
/// exercised against a scripted runner instead of a real daemon.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Program name used for logging, e.g. `docker`.
    fn program(&self) -> &str;

    /// Run with captured output. A non-zero exit is reported through
    /// [`ProcessOutput::exit_code`], not as an error.
    async fn output(&self, args: &[String]) -> Result<ProcessOutput>;

    /// Run with the terminal attached and return the exit code.
    async fn attached(&self, args: &[String]) -> Result<i32>;
}

/// [`CommandRunner`] that spawns a real program on the host.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    program: String,
    invoker: ProcessInvoker,
}

impl SystemCommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            invoker: ProcessInvoker::new(),
        }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    fn program(&self) -> &str {
        &self.program
    }

    async fn output(&self, args: &[String]) -> Result<ProcessOutput> {
        self.invoker.execute(&self.program, args).await
    }

    async fn attached(&self, args: &[String]) -> Result<i32> {
        self.invoker.execute_attached(&self.program, args).await
    }
}
