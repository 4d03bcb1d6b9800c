//! Executor abstraction for external agent invocation.
//!
//! The [`Executor`] trait decouples the command-backed gateways from the agent
//! backend (by default `codex exec`). Tests use fake executors that write
//! predetermined outputs without spawning processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::io::process::run_command_with_timeout;

/// Parameters for an executor invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Working directory for the executor process.
    pub workdir: PathBuf,
    /// Prompt text fed on stdin.
    pub prompt: String,
    /// JSON Schema that constrains agent output.
    pub output_schema_path: PathBuf,
    /// Where the agent must write its output JSON.
    pub output_path: PathBuf,
    /// Where executor stdout/stderr is logged.
    pub executor_log_path: PathBuf,
    pub timeout: Duration,
    /// Truncate executor output logs beyond this many bytes.
    pub output_limit_bytes: usize,
    /// Extra environment for the child process.
    pub env: Vec<(String, String)>,
}

/// Abstraction over agent execution backends.
pub trait Executor: Send + Sync {
    /// Run the agent. Must write output to `request.output_path`.
    fn exec(&self, request: &ExecRequest) -> Result<()>;
}

/// Executor that spawns a configured agent command.
///
/// The output flags and the `-` stdin marker are appended to `command`,
/// matching the `codex exec` interface.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    command: Vec<String>,
}

impl CommandExecutor {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("executor command must not be empty"));
        }
        Ok(Self { command })
    }

    fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }
}

impl Executor for CommandExecutor {
    #[instrument(skip_all, fields(program = self.program(), timeout_secs = request.timeout.as_secs()))]
    fn exec(&self, request: &ExecRequest) -> Result<()> {
        info!(workdir = %request.workdir.display(), "starting agent command");

        if !request.output_schema_path.exists() {
            return Err(anyhow!(
                "missing output schema {}",
                request.output_schema_path.display()
            ));
        }
        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir {}", parent.display()))?;
        }
        fs::create_dir_all(&request.workdir)
            .with_context(|| format!("create workdir {}", request.workdir.display()))?;

        let mut cmd = Command::new(self.program());
        cmd.args(&self.command[1..])
            .arg("--output-schema")
            .arg(&request.output_schema_path)
            .arg("--output-last-message")
            .arg(&request.output_path)
            .arg("-")
            .current_dir(&request.workdir)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
        )
        .with_context(|| format!("run {}", self.program()))?;

        write_executor_log(
            &request.executor_log_path,
            &output.render_log("executor"),
            request.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "agent command timed out");
            return Err(anyhow!(
                "{} timed out after {:?}",
                self.program(),
                request.timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent command failed");
            return Err(anyhow!(
                "{} failed with status {:?}",
                self.program(),
                output.status.code()
            ));
        }

        debug!("agent command completed successfully");
        Ok(())
    }
}

/// Execute the agent and load its output as JSON of type `T`.
#[instrument(skip_all, fields(output_path = %request.output_path.display()))]
pub fn execute_and_load_json<E: Executor + ?Sized, T: DeserializeOwned>(
    executor: &E,
    request: &ExecRequest,
) -> Result<T> {
    if request.output_path.exists() {
        fs::remove_file(&request.output_path)
            .with_context(|| format!("remove stale output {}", request.output_path.display()))?;
    }
    executor.exec(request)?;
    if !request.output_path.exists() {
        return Err(anyhow!(
            "missing executor output {}",
            request.output_path.display()
        ));
    }
    let contents = fs::read_to_string(&request.output_path)
        .with_context(|| format!("read agent output {}", request.output_path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse {}", request.output_path.display()))
}

fn write_executor_log(path: &Path, log: &str, output_limit: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create executor log dir {}", parent.display()))?;
    }
    let contents = if log.len() > output_limit {
        let mut cut = output_limit;
        while !log.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}\n[truncated {} bytes]\n", &log[..cut], log.len() - cut)
    } else {
        log.to_string()
    };
    fs::write(path, contents).with_context(|| format!("write executor log {}", path.display()))
}
