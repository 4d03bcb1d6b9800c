//! Engine configuration stored in `nexus.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::params::{BetaBounds, MAX_THINKING_BUDGET, MIN_THINKING_BUDGET, SystemParameters};
use crate::core::rollup::RollupPolicy;
use crate::engine::{ContextUpdate, EngineOptions};

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "nexus.toml";

/// Engine configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values the interactive front-end starts with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NexusConfig {
    pub params: ParamsConfig,
    pub run: RunConfig,
    pub engine: EngineConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParamsConfig {
    pub alpha: f32,
    pub beta: u32,
    pub gamma: f32,
    pub recursion_limit: u32,
    pub beta_min: u32,
    pub beta_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Delay between scheduler cycles. Pacing only; 0 is valid.
    pub interval_ms: u64,

    /// Upper bound on cycles for a single `nexus run`.
    pub max_cycles: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub rollup: RollupPolicy,
    pub context_update: ContextUpdate,

    /// Characters of a direct solution kept in its `[New Fact]` line.
    pub fact_excerpt_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Agent command; output flags and the stdin marker are appended.
    pub command: Vec<String>,

    /// Directory for per-call prompts, schemas and outputs.
    pub work_dir: PathBuf,

    /// Wall-clock budget per scheduler cycle (analysis + synthesis).
    pub cycle_timeout_secs: u64,

    /// Truncate agent stdout/stderr logs beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Maximum bytes for a rendered prompt before sections are trimmed.
    pub prompt_budget_bytes: usize,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        let params = SystemParameters::default();
        Self {
            alpha: params.alpha,
            beta: params.beta,
            gamma: params.gamma,
            recursion_limit: params.recursion_limit,
            beta_min: MIN_THINKING_BUDGET,
            beta_max: MAX_THINKING_BUDGET,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_cycles: 500,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rollup: RollupPolicy::ChildrenComplete,
            context_update: ContextUpdate::FactExcerpt,
            fact_excerpt_chars: 100,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
            ],
            work_dir: PathBuf::from(".nexus"),
            cycle_timeout_secs: 5 * 60,
            output_limit_bytes: 100_000,
            prompt_budget_bytes: 40_000,
        }
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            params: ParamsConfig::default(),
            run: RunConfig::default(),
            engine: EngineConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl NexusConfig {
    pub fn validate(&self) -> Result<()> {
        self.system_parameters().validate(self.beta_bounds())?;
        if self.run.max_cycles == 0 {
            return Err(anyhow!("run.max_cycles must be > 0"));
        }
        if self.engine.fact_excerpt_chars == 0 {
            return Err(anyhow!("engine.fact_excerpt_chars must be > 0"));
        }
        if self.gateway.command.is_empty() || self.gateway.command[0].trim().is_empty() {
            return Err(anyhow!("gateway.command must be a non-empty array"));
        }
        if self.gateway.cycle_timeout_secs == 0 {
            return Err(anyhow!("gateway.cycle_timeout_secs must be > 0"));
        }
        if self.gateway.output_limit_bytes == 0 {
            return Err(anyhow!("gateway.output_limit_bytes must be > 0"));
        }
        if self.gateway.prompt_budget_bytes == 0 {
            return Err(anyhow!("gateway.prompt_budget_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn system_parameters(&self) -> SystemParameters {
        SystemParameters {
            alpha: self.params.alpha,
            beta: self.params.beta,
            gamma: self.params.gamma,
            recursion_limit: self.params.recursion_limit,
        }
    }

    pub fn beta_bounds(&self) -> BetaBounds {
        BetaBounds {
            min: self.params.beta_min,
            max: self.params.beta_max,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.run.interval_ms)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            rollup: self.engine.rollup,
            context_update: self.engine.context_update,
            fact_excerpt_chars: self.engine.fact_excerpt_chars,
            cycle_timeout: Duration::from_secs(self.gateway.cycle_timeout_secs),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `NexusConfig::default()`.
pub fn load_config(path: &Path) -> Result<NexusConfig> {
    if !path.exists() {
        let cfg = NexusConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: NexusConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &NexusConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
