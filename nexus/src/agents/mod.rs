//! Reasoning gateways consulted by the engine.
//!
//! The engine only sees the [`Analyzer`] and [`Synthesizer`] traits. The
//! command-backed implementations in this module drive an external agent
//! process; tests substitute scripted gateways.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::core::params::SystemParameters;
use crate::core::types::{AnalysisResult, Goal};
use crate::engine::Engine;
use crate::io::config::NexusConfig;
use crate::io::executor::CommandExecutor;
use crate::session::Session;

pub mod analyzer;
pub mod synthesizer;

pub use analyzer::CommandAnalyzer;
pub use synthesizer::CommandSynthesizer;

/// Decides whether a goal can be solved directly or must be decomposed.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        goal: &Goal,
        context: &str,
        params: &SystemParameters,
    ) -> Result<AnalysisResult>;
}

/// Summarizes completed goals into a short piece of text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// `goals` is the whole forest; only `Completed` goals are summarized.
    async fn synthesize(&self, goals: &[Goal], params: &SystemParameters) -> Result<String>;
}

/// Settings shared by the command-backed gateways.
#[derive(Debug, Clone)]
pub struct CommandGatewayConfig {
    /// Per-call artifacts land under `<work_dir>/calls/`.
    pub work_dir: PathBuf,
    pub timeout: Duration,
    pub prompt_budget_bytes: usize,
    pub output_limit_bytes: usize,
}

impl CommandGatewayConfig {
    pub(crate) fn call_dir(&self, key: &str) -> PathBuf {
        self.work_dir.join("calls").join(key)
    }
}

/// Parameters exposed to the agent process as environment variables.
pub(crate) fn params_env(params: &SystemParameters) -> Vec<(String, String)> {
    vec![
        ("NEXUS_ALPHA".to_string(), params.alpha.to_string()),
        ("NEXUS_BETA".to_string(), params.beta.to_string()),
        ("NEXUS_GAMMA".to_string(), params.gamma.to_string()),
        (
            "NEXUS_RECURSION_LIMIT".to_string(),
            params.recursion_limit.to_string(),
        ),
    ]
}

pub(crate) fn write_output_schema(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create schema dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write schema {}", path.display()))
}

/// Build an engine whose gateways run the configured agent command.
///
/// Creates `work_dir` and resolves it to an absolute path, since the agent
/// runs inside it.
pub fn command_engine(cfg: &NexusConfig) -> Result<Engine> {
    fs::create_dir_all(&cfg.gateway.work_dir)
        .with_context(|| format!("create {}", cfg.gateway.work_dir.display()))?;
    let work_dir = std::path::absolute(&cfg.gateway.work_dir)
        .with_context(|| format!("resolve {}", cfg.gateway.work_dir.display()))?;

    let executor = Arc::new(CommandExecutor::new(cfg.gateway.command.clone())?);
    let gateway = CommandGatewayConfig {
        work_dir,
        timeout: Duration::from_secs(cfg.gateway.cycle_timeout_secs),
        prompt_budget_bytes: cfg.gateway.prompt_budget_bytes,
        output_limit_bytes: cfg.gateway.output_limit_bytes,
    };
    let analyzer = CommandAnalyzer::new(Arc::clone(&executor), gateway.clone());
    let synthesizer = CommandSynthesizer::new(executor, gateway);
    let session = Session::new(cfg.system_parameters(), cfg.beta_bounds())?;
    Ok(Engine::new(
        session,
        Arc::new(analyzer),
        Arc::new(synthesizer),
        cfg.engine_options(),
    ))
}
