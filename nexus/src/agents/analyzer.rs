//! Analyzer backed by an external agent command.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::params::SystemParameters;
use crate::core::types::{AnalysisResult, Goal};
use crate::io::executor::{ExecRequest, Executor, execute_and_load_json};
use crate::io::prompt::PromptBuilder;
use crate::io::schema::{ANALYSIS_OUTPUT_SCHEMA, validate_against};

use super::{Analyzer, CommandGatewayConfig, params_env, write_output_schema};

pub struct CommandAnalyzer<E> {
    executor: Arc<E>,
    config: CommandGatewayConfig,
}

impl<E: Executor + 'static> CommandAnalyzer<E> {
    pub fn new(executor: Arc<E>, config: CommandGatewayConfig) -> Self {
        Self { executor, config }
    }

    fn request(&self, goal: &Goal, prompt: String, params: &SystemParameters) -> ExecRequest {
        let call_dir = self.config.call_dir(&goal.id);
        ExecRequest {
            workdir: self.config.work_dir.clone(),
            prompt,
            output_schema_path: call_dir.join("analysis_output.schema.json"),
            output_path: call_dir.join("analysis_output.json"),
            executor_log_path: call_dir.join("analysis_executor.log"),
            timeout: self.config.timeout,
            output_limit_bytes: self.config.output_limit_bytes,
            env: params_env(params),
        }
    }
}

#[async_trait]
impl<E: Executor + 'static> Analyzer for CommandAnalyzer<E> {
    #[instrument(skip_all, fields(goal_id = %goal.id, depth = goal.depth))]
    async fn analyze(
        &self,
        goal: &Goal,
        context: &str,
        params: &SystemParameters,
    ) -> Result<AnalysisResult> {
        let prompt = PromptBuilder::new(self.config.prompt_budget_bytes)
            .build_analyzer(goal, context, params)
            .context("render analyzer prompt")?;
        let request = self.request(goal, prompt, params);
        let executor = Arc::clone(&self.executor);

        let value: Value = tokio::task::spawn_blocking(move || {
            write_output_schema(&request.output_schema_path, ANALYSIS_OUTPUT_SCHEMA)?;
            execute_and_load_json(executor.as_ref(), &request)
        })
        .await
        .context("analyzer task panicked")??;

        validate_against(ANALYSIS_OUTPUT_SCHEMA, &value).context("validate analysis output")?;
        let analysis: AnalysisResult =
            serde_json::from_value(value).context("parse analysis output")?;
        debug!(
            gaps = analysis.has_knowledge_gaps,
            sub_goals = analysis.sub_goals.len(),
            "analysis received"
        );
        Ok(analysis)
    }
}
