//! Scripted gateways and engine builders for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::agents::{Analyzer, Synthesizer};
use crate::core::params::{BetaBounds, SystemParameters};
use crate::core::types::{AnalysisResult, Goal, SubGoalSpec};
use crate::engine::{Engine, EngineOptions};
use crate::session::Session;

pub fn sub_goal(description: &str, priority: i64, confidence: i64) -> SubGoalSpec {
    SubGoalSpec {
        description: description.to_string(),
        predicted_confidence: Some(confidence),
        priority: Some(priority),
    }
}

/// What the analyzer was asked.
#[derive(Debug, Clone)]
pub struct AnalyzerCall {
    pub description: String,
    pub depth: u32,
    pub context: String,
    pub params: SystemParameters,
}

/// Analyzer that replays a fixed queue of responses.
pub struct ScriptedAnalyzer {
    responses: Mutex<VecDeque<Result<AnalysisResult, String>>>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<AnalyzerCall>>>,
}

impl ScriptedAnalyzer {
    /// `Err` entries are returned as gateway failures.
    pub fn new(responses: Vec<Result<AnalysisResult, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep before answering, to hold a cycle in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<AnalyzerCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze(
        &self,
        goal: &Goal,
        context: &str,
        params: &SystemParameters,
    ) -> Result<AnalysisResult> {
        self.calls.lock().expect("calls lock").push(AnalyzerCall {
            description: goal.description.clone(),
            depth: goal.depth,
            context: context.to_string(),
            params: *params,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().expect("responses lock").pop_front();
        match next {
            Some(Ok(analysis)) => Ok(analysis),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!(
                "no scripted analysis left for \"{}\"",
                goal.description
            )),
        }
    }
}

/// Analyzer that derives its answer from the goal.
pub struct FnAnalyzer<F> {
    rule: F,
}

impl<F> FnAnalyzer<F>
where
    F: Fn(&Goal) -> AnalysisResult + Send + Sync,
{
    pub fn new(rule: F) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl<F> Analyzer for FnAnalyzer<F>
where
    F: Fn(&Goal) -> AnalysisResult + Send + Sync,
{
    async fn analyze(
        &self,
        goal: &Goal,
        _context: &str,
        _params: &SystemParameters,
    ) -> Result<AnalysisResult> {
        Ok((self.rule)(goal))
    }
}

/// Synthesizer with a fixed reply that records the goals it was shown.
pub struct ScriptedSynthesizer {
    reply: Result<String, String>,
    seen: Arc<Mutex<Vec<Vec<Goal>>>>,
}

impl Default for ScriptedSynthesizer {
    fn default() -> Self {
        Self::replying("")
    }
}

impl ScriptedSynthesizer {
    pub fn replying(summary: &str) -> Self {
        Self {
            reply: Ok(summary.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<Vec<Goal>>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, goals: &[Goal], _params: &SystemParameters) -> Result<String> {
        self.seen.lock().expect("seen lock").push(goals.to_vec());
        self.reply.clone().map_err(|message| anyhow!(message))
    }
}

pub fn engine_with(
    analyzer: impl Analyzer + 'static,
    synthesizer: impl Synthesizer + 'static,
    params: SystemParameters,
    options: EngineOptions,
) -> Arc<Engine> {
    let session = Session::new(params, BetaBounds::default()).expect("valid test params");
    Arc::new(Engine::new(
        session,
        Arc::new(analyzer),
        Arc::new(synthesizer),
        options,
    ))
}
