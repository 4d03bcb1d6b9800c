//! Synthesizer backed by an external agent command.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::params::SystemParameters;
use crate::core::types::{Goal, GoalStatus};
use crate::io::executor::{ExecRequest, Executor, execute_and_load_json};
use crate::io::prompt::PromptBuilder;
use crate::io::schema::{SYNTHESIS_OUTPUT_SCHEMA, validate_against};

use super::{CommandGatewayConfig, Synthesizer, params_env, write_output_schema};

#[derive(Debug, Deserialize)]
struct SynthesisOutput {
    summary: String,
}

pub struct CommandSynthesizer<E> {
    executor: Arc<E>,
    config: CommandGatewayConfig,
}

impl<E: Executor + 'static> CommandSynthesizer<E> {
    pub fn new(executor: Arc<E>, config: CommandGatewayConfig) -> Self {
        Self { executor, config }
    }
}

#[async_trait]
impl<E: Executor + 'static> Synthesizer for CommandSynthesizer<E> {
    #[instrument(skip_all, fields(goals = goals.len()))]
    async fn synthesize(&self, goals: &[Goal], params: &SystemParameters) -> Result<String> {
        let completed: Vec<&Goal> = goals
            .iter()
            .filter(|goal| goal.status == GoalStatus::Completed)
            .collect();
        // Newest completion last; its id names the call directory.
        let Some(latest) = completed.last() else {
            return Ok(String::new());
        };

        let prompt = PromptBuilder::new(self.config.prompt_budget_bytes)
            .build_synthesizer(&completed, params)
            .context("render synthesizer prompt")?;
        let call_dir = self.config.call_dir(&latest.id);
        let request = ExecRequest {
            workdir: self.config.work_dir.clone(),
            prompt,
            output_schema_path: call_dir.join("synthesis_output.schema.json"),
            output_path: call_dir.join("synthesis_output.json"),
            executor_log_path: call_dir.join("synthesis_executor.log"),
            timeout: self.config.timeout,
            output_limit_bytes: self.config.output_limit_bytes,
            env: params_env(params),
        };
        let executor = Arc::clone(&self.executor);

        let value: Value = tokio::task::spawn_blocking(move || {
            write_output_schema(&request.output_schema_path, SYNTHESIS_OUTPUT_SCHEMA)?;
            execute_and_load_json(executor.as_ref(), &request)
        })
        .await
        .context("synthesizer task panicked")??;

        validate_against(SYNTHESIS_OUTPUT_SCHEMA, &value).context("validate synthesis output")?;
        let output: SynthesisOutput =
            serde_json::from_value(value).context("parse synthesis output")?;
        debug!(summary_len = output.summary.len(), "synthesis received");
        Ok(output.summary.trim().to_string())
    }
}
