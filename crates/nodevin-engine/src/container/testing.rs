// Scripted CommandRunner for tests: records every argv and answers with
// canned outputs matched by argv prefix.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use nodevin_sdk::{CommandRunner, ProcessOutput};

struct Rule {
    prefix: Vec<String>,
    output: ProcessOutput,
}

#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    rules: Mutex<Vec<Rule>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every call starting with `prefix` with `output`.
    pub fn on(&self, prefix: &[&str], output: ProcessOutput) {
        self.rules.lock().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output,
        });
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Recorded calls with their arguments joined by spaces.
    pub fn joined_calls(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.join(" ")).collect()
    }

    fn respond(&self, args: &[String]) -> ProcessOutput {
        self.calls.lock().push(args.to_vec());
        self.rules
            .lock()
            .iter()
            .find(|rule| args.starts_with(&rule.prefix))
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| ProcessOutput::ok(""))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    fn program(&self) -> &str {
        "docker"
    }

    async fn output(&self, args: &[String]) -> Result<ProcessOutput> {
        Ok(self.respond(args))
    }

    async fn attached(&self, args: &[String]) -> Result<i32> {
        Ok(self.respond(args).exit_code)
    }
}
