//! Scheduler cycle over a shared session.
//!
//! One cycle selects the next pending goal, asks the [`Analyzer`] about it and
//! applies the result: branch into children, solve directly (consulting the
//! [`Synthesizer`]), or force a best-effort completion at the depth limit.
//!
//! Cycles are single-flight. A trigger that arrives while another cycle is
//! still running returns [`CycleOutcome::Skipped`] without touching state.
//! The session lock is never held across a gateway call; every mutation is
//! built on a copy of the store and committed in one step.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::agents::{Analyzer, Synthesizer};
use crate::core::budget::remaining_budget;
use crate::core::context::{fact_excerpt, synthesis_entry};
use crate::core::decision::{AppliedAnalysis, Decision, decide};
use crate::core::event_log::LogKind;
use crate::core::params::SystemParameters;
use crate::core::invariants::validate_invariants;
use crate::core::path::{forest_summary, goal_path};
use crate::core::rollup::{RolledUp, RollupPolicy, rollup_ancestors};
use crate::core::selector::{SelectOutcome, select_goal};
use crate::core::store::{GoalPatch, GoalStore};
use crate::core::types::{BEST_EFFORT_OUTCOME, Goal, GoalId, GoalStatus};
use crate::session::{Session, SessionSnapshot};

pub const ALL_COMPLETED: &str = "All directives completed. Standing by.";
pub const RECURSION_LIMIT_REACHED: &str = "Recursion limit reached. Attempting best-effort solution.";

const EVENT_CAPACITY: usize = 256;

/// What a direct solve appends to the knowledge context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextUpdate {
    /// `[New Fact]: <excerpt>...`
    #[default]
    FactExcerpt,
    /// `[Synthesis]: <summary>`, or the excerpt when the summary is empty.
    Synthesis,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub rollup: RollupPolicy,
    pub context_update: ContextUpdate,
    pub fact_excerpt_chars: usize,
    /// Wall-clock budget for all gateway calls of one cycle.
    pub cycle_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rollup: RollupPolicy::default(),
            context_update: ContextUpdate::default(),
            fact_excerpt_chars: 100,
            cycle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    InFlight,
}

/// Result of one scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    /// Nothing pending, but not everything is completed.
    Idle,
    /// Every goal is completed; the run was stopped.
    Complete,
    Branched { goal_id: GoalId, spawned: usize },
    Solved { goal_id: GoalId, rolled_up: usize },
    Fallback { goal_id: GoalId, rolled_up: usize },
    /// A gateway error; the goal is `Failed` and the run was stopped.
    Failed { goal_id: GoalId, error: String },
    /// A new directive replaced the forest while the goal was in flight.
    Superseded { goal_id: GoalId },
}

/// Change notification for observers of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    DirectiveSubmitted,
    GoalsChanged,
    LogsChanged,
    ContextChanged,
    ParamsChanged,
    RunStateChanged { running: bool },
}

impl SessionEvent {
    pub fn name(self) -> &'static str {
        match self {
            SessionEvent::DirectiveSubmitted => "directive_submitted",
            SessionEvent::GoalsChanged => "goals_changed",
            SessionEvent::LogsChanged => "logs_changed",
            SessionEvent::ContextChanged => "context_changed",
            SessionEvent::ParamsChanged => "params_changed",
            SessionEvent::RunStateChanged { .. } => "run_state_changed",
        }
    }
}

/// Held for the duration of a cycle; releases the flag on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Engine {
    session: Mutex<Session>,
    in_flight: AtomicBool,
    analyzer: Arc<dyn Analyzer>,
    synthesizer: Arc<dyn Synthesizer>,
    options: EngineOptions,
    events: broadcast::Sender<SessionEvent>,
}

impl Engine {
    pub fn new(
        session: Session,
        analyzer: Arc<dyn Analyzer>,
        synthesizer: Arc<dyn Synthesizer>,
        options: EngineOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Mutex::new(session),
            in_flight: AtomicBool::new(false),
            analyzer,
            synthesizer,
            options,
            events,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, events: &[SessionEvent]) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(*event);
        }
    }

    pub async fn submit_directive(&self, text: &str) -> Result<Goal> {
        let root = self.session.lock().await.submit_directive(text)?;
        self.emit(&[
            SessionEvent::DirectiveSubmitted,
            SessionEvent::GoalsChanged,
            SessionEvent::LogsChanged,
            SessionEvent::ContextChanged,
        ]);
        Ok(root)
    }

    pub async fn start(&self) {
        self.set_running(true).await;
    }

    pub async fn stop(&self) {
        self.set_running(false).await;
    }

    /// Flip the running flag and return the new value.
    pub async fn toggle(&self) -> bool {
        let running = {
            let mut session = self.session.lock().await;
            let running = !session.is_running();
            session.set_running(running);
            running
        };
        info!(running, "run toggled");
        self.emit(&[SessionEvent::RunStateChanged { running }]);
        running
    }

    async fn set_running(&self, running: bool) {
        let changed = {
            let mut session = self.session.lock().await;
            let changed = session.is_running() != running;
            session.set_running(running);
            changed
        };
        if changed {
            info!(running, "run state changed");
            self.emit(&[SessionEvent::RunStateChanged { running }]);
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_running()
    }

    pub async fn params(&self) -> SystemParameters {
        *self.session.lock().await.params()
    }

    /// Applies to cycles that start after this call.
    pub async fn set_params(&self, params: SystemParameters) -> Result<()> {
        self.session.lock().await.set_params(params)?;
        info!(?params, "parameters updated");
        self.emit(&[SessionEvent::ParamsChanged]);
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Indented outline of the forest, at most `max_goals` lines.
    pub async fn forest_summary(&self, max_goals: usize) -> String {
        forest_summary(self.session.lock().await.store(), max_goals)
    }

    /// Structural problems in the current forest; empty when healthy.
    pub async fn invariant_errors(&self) -> Vec<String> {
        let session = self.session.lock().await;
        validate_invariants(session.store(), session.params())
    }

    pub fn is_cycle_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one scheduler cycle.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("cycle skipped: another cycle is in flight");
            return Ok(CycleOutcome::Skipped(SkipReason::InFlight));
        };
        let deadline = Instant::now() + self.options.cycle_timeout;

        let (goal, context, params, path) = {
            let mut session = self.session.lock().await;
            if !session.is_running() {
                return Ok(CycleOutcome::Skipped(SkipReason::NotRunning));
            }
            let goal = match select_goal(session.store()) {
                SelectOutcome::Complete => {
                    session.log_mut().append(LogKind::Info, ALL_COMPLETED, None);
                    session.set_running(false);
                    drop(session);
                    info!("all goals completed, stopping run");
                    self.emit(&[
                        SessionEvent::LogsChanged,
                        SessionEvent::RunStateChanged { running: false },
                    ]);
                    return Ok(CycleOutcome::Complete);
                }
                SelectOutcome::Idle => return Ok(CycleOutcome::Idle),
                SelectOutcome::Open(goal) => goal.clone(),
            };
            session
                .store_mut()
                .update(&goal.id, GoalPatch::status(GoalStatus::Analyzing))?;
            session.log_mut().append(
                LogKind::Thought,
                format!("Analyzing Goal: \"{}\"", goal.description),
                Some(format!("Depth: {} | Priority: {}", goal.depth, goal.priority)),
            );
            let path = goal_path(session.store(), &goal.id).unwrap_or_else(|| goal.id.clone());
            (goal, session.context().snapshot(), *session.params(), path)
        };
        self.emit(&[SessionEvent::GoalsChanged, SessionEvent::LogsChanged]);

        let span = info_span!("cycle", goal_path = %path, depth = goal.depth);
        async {
            match self.process(&goal, &context, &params, deadline).await {
                Ok(outcome) => Ok(outcome),
                Err(err) => self.fail(&goal, &err).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        goal: &Goal,
        context: &str,
        params: &SystemParameters,
        deadline: Instant,
    ) -> Result<CycleOutcome> {
        let analysis = within_budget(
            deadline,
            "analyzer",
            self.analyzer.analyze(goal, context, params),
        )
        .await?;

        let mut session = self.session.lock().await;
        if !is_in_flight(&session, &goal.id) {
            return Ok(superseded(goal));
        }
        session.log_mut().append(
            LogKind::Reasoning,
            format!(
                "Analysis Complete. Gaps: {} (Confidence: {}%)",
                analysis.has_knowledge_gaps, analysis.analysis_confidence
            ),
            None,
        );
        let applied = decide(goal, &analysis, params.recursion_limit).map_err(|err| anyhow!(err))?;

        match &applied.decision {
            Decision::Fallback => {
                let mut working = session.store().clone();
                working.update(
                    &goal.id,
                    GoalPatch::status(GoalStatus::Completed)
                        .with_outcome(BEST_EFFORT_OUTCOME)
                        .with_trace(applied.reasoning.clone())
                        .with_confidence(applied.confidence),
                )?;
                let rolled = self.rollup(&mut working, &goal.id)?;
                *session.store_mut() = working;
                session
                    .log_mut()
                    .append(LogKind::Error, RECURSION_LIMIT_REACHED, None);
                log_rollups(&mut session, &rolled);
                drop(session);
                warn!(
                    recursion_limit = params.recursion_limit,
                    "depth limit reached with open gaps, completing best-effort"
                );
                self.emit(&[SessionEvent::GoalsChanged, SessionEvent::LogsChanged]);
                Ok(CycleOutcome::Fallback {
                    goal_id: goal.id.clone(),
                    rolled_up: rolled.len(),
                })
            }
            Decision::Branch(children) => {
                let mut working = session.store().clone();
                working.update(
                    &goal.id,
                    GoalPatch::status(GoalStatus::Reasoning)
                        .with_trace(applied.reasoning.clone())
                        .with_confidence(applied.confidence),
                )?;
                for child in children {
                    working.create(
                        child.description.clone(),
                        Some(&goal.id),
                        goal.depth + 1,
                        child.priority,
                        child.confidence,
                    )?;
                }
                *session.store_mut() = working;
                session.log_mut().append(
                    LogKind::Action,
                    format!(
                        "Spawned {} sub-goals to bridge knowledge gaps.",
                        children.len()
                    ),
                    None,
                );
                drop(session);
                info!(spawned = children.len(), "goal branched");
                self.emit(&[SessionEvent::GoalsChanged, SessionEvent::LogsChanged]);
                Ok(CycleOutcome::Branched {
                    goal_id: goal.id.clone(),
                    spawned: children.len(),
                })
            }
            Decision::Solve(solution) => {
                // The synthesizer sees the forest as it will be once the
                // solution is committed.
                let mut preview = session.store().clone();
                apply_solution(&mut preview, goal, solution, &applied)?;
                let goals = preview.all().to_vec();
                drop(session);
                self.emit(&[SessionEvent::LogsChanged]);

                let summary = within_budget(
                    deadline,
                    "synthesizer",
                    self.synthesizer.synthesize(&goals, params),
                )
                .await?;
                self.commit_solution(goal, solution, &applied, &summary)
                    .await
            }
        }
    }

    async fn commit_solution(
        &self,
        goal: &Goal,
        solution: &str,
        applied: &AppliedAnalysis,
        summary: &str,
    ) -> Result<CycleOutcome> {
        let mut session = self.session.lock().await;
        if !is_in_flight(&session, &goal.id) {
            return Ok(superseded(goal));
        }
        let mut working = session.store().clone();
        apply_solution(&mut working, goal, solution, applied)?;
        let rolled = self.rollup(&mut working, &goal.id)?;
        *session.store_mut() = working;

        session.log_mut().append(
            LogKind::Action,
            format!("Goal Solved: {}", goal.description),
            None,
        );
        let entry = match self.options.context_update {
            ContextUpdate::Synthesis if !summary.trim().is_empty() => {
                synthesis_entry(summary.trim())
            }
            ContextUpdate::FactExcerpt | ContextUpdate::Synthesis => {
                fact_excerpt(solution, self.options.fact_excerpt_chars)
            }
        };
        session.context_mut().append(&entry);
        log_rollups(&mut session, &rolled);
        drop(session);

        info!(rolled_up = rolled.len(), "goal solved");
        self.emit(&[
            SessionEvent::GoalsChanged,
            SessionEvent::LogsChanged,
            SessionEvent::ContextChanged,
        ]);
        Ok(CycleOutcome::Solved {
            goal_id: goal.id.clone(),
            rolled_up: rolled.len(),
        })
    }

    fn rollup(&self, store: &mut GoalStore, completed_id: &str) -> Result<Vec<RolledUp>> {
        match self.options.rollup {
            RollupPolicy::Disabled => Ok(Vec::new()),
            RollupPolicy::ChildrenComplete => rollup_ancestors(store, completed_id),
        }
    }

    async fn fail(&self, goal: &Goal, err: &anyhow::Error) -> Result<CycleOutcome> {
        let message = format!("{err:#}");
        let mut session = self.session.lock().await;
        if !is_in_flight(&session, &goal.id) {
            return Ok(superseded(goal));
        }
        session
            .store_mut()
            .update(&goal.id, GoalPatch::status(GoalStatus::Failed))?;
        session
            .log_mut()
            .append(LogKind::Error, format!("Cycle failed: {message}"), None);
        session.set_running(false);
        drop(session);

        error!(err = %message, "cycle failed, stopping run");
        self.emit(&[
            SessionEvent::GoalsChanged,
            SessionEvent::LogsChanged,
            SessionEvent::RunStateChanged { running: false },
        ]);
        Ok(CycleOutcome::Failed {
            goal_id: goal.id.clone(),
            error: message,
        })
    }
}

fn apply_solution(
    store: &mut GoalStore,
    goal: &Goal,
    solution: &str,
    applied: &AppliedAnalysis,
) -> Result<()> {
    store.update(
        &goal.id,
        GoalPatch::status(GoalStatus::Completed)
            .with_outcome(solution)
            .with_trace(applied.reasoning.clone())
            .with_confidence(applied.confidence),
    )
}

fn log_rollups(session: &mut Session, rolled: &[RolledUp]) {
    for parent in rolled {
        session.log_mut().append(
            LogKind::Action,
            format!(
                "Sub-goals resolved. Rolled up \"{}\" from {} completed sub-goals.",
                parent.description, parent.children
            ),
            None,
        );
        info!(goal_id = %parent.id, children = parent.children, "parent rolled up");
    }
}

fn is_in_flight(session: &Session, goal_id: &str) -> bool {
    session
        .store()
        .get(goal_id)
        .is_some_and(|goal| goal.status == GoalStatus::Analyzing)
}

fn superseded(goal: &Goal) -> CycleOutcome {
    info!(goal_id = %goal.id, "goal replaced by a new directive while in flight");
    CycleOutcome::Superseded {
        goal_id: goal.id.clone(),
    }
}

/// Await a gateway call within what is left of the cycle budget.
async fn within_budget<T>(
    deadline: Instant,
    label: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    let remaining = remaining_budget(deadline)?;
    match tokio::time::timeout(remaining, call).await {
        Ok(result) => result.map_err(|err| err.context(format!("{label} failed"))),
        Err(_) => Err(anyhow!("{label} timed out after {remaining:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAnalyzer, ScriptedSynthesizer, engine_with, sub_goal};
    use crate::core::types::AnalysisResult;

    async fn running_engine(
        analyzer: ScriptedAnalyzer,
        synthesizer: ScriptedSynthesizer,
        options: EngineOptions,
    ) -> Arc<Engine> {
        let engine = engine_with(analyzer, synthesizer, SystemParameters::default(), options);
        engine.submit_directive("root").await.expect("directive");
        engine.start().await;
        engine
    }

    #[tokio::test]
    async fn stopped_engine_skips_without_side_effects() {
        let engine = engine_with(
            ScriptedAnalyzer::new(Vec::new()),
            ScriptedSynthesizer::default(),
            SystemParameters::default(),
            EngineOptions::default(),
        );
        engine.submit_directive("root").await.expect("directive");
        let before = engine.snapshot().await;

        let outcome = engine.run_cycle().await.expect("cycle");

        assert_eq!(outcome, CycleOutcome::Skipped(SkipReason::NotRunning));
        let after = engine.snapshot().await;
        assert_eq!(after.goals, before.goals);
        assert_eq!(after.logs.len(), before.logs.len());
    }

    #[tokio::test]
    async fn branch_logs_thought_reasoning_and_action() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::gaps(
            "split",
            40,
            vec![sub_goal("a", 8, 60), sub_goal("b", 3, 70)],
        ))]);
        let engine = running_engine(
            analyzer,
            ScriptedSynthesizer::default(),
            EngineOptions::default(),
        )
        .await;

        let outcome = engine.run_cycle().await.expect("cycle");
        assert!(matches!(outcome, CycleOutcome::Branched { spawned: 2, .. }));

        let snapshot = engine.snapshot().await;
        let kinds: Vec<LogKind> = snapshot.logs.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LogKind::Info,
                LogKind::Thought,
                LogKind::Reasoning,
                LogKind::Action
            ]
        );
        assert_eq!(snapshot.logs[1].message, "Analyzing Goal: \"root\"");
        assert_eq!(
            snapshot.logs[1].details.as_deref(),
            Some("Depth: 0 | Priority: 10")
        );
        assert_eq!(
            snapshot.logs[2].message,
            "Analysis Complete. Gaps: true (Confidence: 40%)"
        );
        assert_eq!(
            snapshot.logs[3].message,
            "Spawned 2 sub-goals to bridge knowledge gaps."
        );
        assert_eq!(snapshot.goals[0].status, GoalStatus::Reasoning);
        assert_eq!(snapshot.goals[0].reasoning_trace.as_deref(), Some("split"));
        assert_eq!(snapshot.goals[0].confidence_score, 40);
    }

    #[tokio::test]
    async fn synthesis_policy_appends_summary() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))]);
        let options = EngineOptions {
            context_update: ContextUpdate::Synthesis,
            ..EngineOptions::default()
        };
        let engine = running_engine(analyzer, ScriptedSynthesizer::replying("Summary."), options).await;

        engine.run_cycle().await.expect("cycle");

        let context = engine.snapshot().await.context;
        assert!(context.ends_with("\n[Synthesis]: Summary."));
    }

    #[tokio::test]
    async fn empty_summary_falls_back_to_excerpt() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))]);
        let options = EngineOptions {
            context_update: ContextUpdate::Synthesis,
            ..EngineOptions::default()
        };
        let engine = running_engine(analyzer, ScriptedSynthesizer::replying(""), options).await;

        engine.run_cycle().await.expect("cycle");

        assert!(engine.snapshot().await.context.ends_with("\n[New Fact]: X..."));
    }

    #[tokio::test]
    async fn synthesizer_sees_the_solved_goal() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))]);
        let synthesizer = ScriptedSynthesizer::replying("s");
        let seen = synthesizer.seen();
        let engine =
            running_engine(analyzer, synthesizer, EngineOptions::default()).await;

        engine.run_cycle().await.expect("cycle");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].status, GoalStatus::Completed);
        assert_eq!(seen[0][0].outcome.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn synthesizer_failure_fails_the_goal() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))]);
        let engine = running_engine(
            analyzer,
            ScriptedSynthesizer::failing("quota exceeded"),
            EngineOptions::default(),
        )
        .await;

        let outcome = engine.run_cycle().await.expect("cycle");

        assert!(matches!(outcome, CycleOutcome::Failed { .. }));
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.goals[0].status, GoalStatus::Failed);
        assert_eq!(snapshot.goals[0].outcome, None);
        assert!(!snapshot.running);
        let last = snapshot.logs.last().expect("log");
        assert_eq!(last.kind, LogKind::Error);
        assert_eq!(last.message, "Cycle failed: synthesizer failed: quota exceeded");
    }

    #[tokio::test]
    async fn unusable_analysis_is_a_failure() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::gaps("split", 40, Vec::new()))]);
        let engine = running_engine(
            analyzer,
            ScriptedSynthesizer::default(),
            EngineOptions::default(),
        )
        .await;

        let outcome = engine.run_cycle().await.expect("cycle");

        let CycleOutcome::Failed { error, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(error.contains("proposed no sub-goals"));
        assert!(!engine.is_running().await);
    }

    #[tokio::test]
    async fn slow_analyzer_times_out() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))])
            .with_delay(Duration::from_millis(200));
        let options = EngineOptions {
            cycle_timeout: Duration::from_millis(20),
            ..EngineOptions::default()
        };
        let engine = running_engine(analyzer, ScriptedSynthesizer::default(), options).await;

        let outcome = engine.run_cycle().await.expect("cycle");

        let CycleOutcome::Failed { error, .. } = outcome else {
            panic!("expected timeout failure, got {outcome:?}");
        };
        assert!(error.contains("analyzer timed out"));
    }

    #[tokio::test]
    async fn new_directive_supersedes_in_flight_goal() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))])
            .with_delay(Duration::from_millis(100));
        let engine = running_engine(
            analyzer,
            ScriptedSynthesizer::default(),
            EngineOptions::default(),
        )
        .await;

        let cycle = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = engine.submit_directive("second").await.expect("directive");

        let outcome = cycle.await.expect("join").expect("cycle");
        assert!(matches!(outcome, CycleOutcome::Superseded { .. }));
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.goals.len(), 1);
        assert_eq!(snapshot.goals[0].id, fresh.id);
        assert_eq!(snapshot.goals[0].status, GoalStatus::Pending);
        assert_eq!(snapshot.logs.len(), 1);
    }

    #[tokio::test]
    async fn toggle_and_events() {
        let engine = engine_with(
            ScriptedAnalyzer::new(Vec::new()),
            ScriptedSynthesizer::default(),
            SystemParameters::default(),
            EngineOptions::default(),
        );
        let mut events = engine.subscribe();

        assert!(engine.toggle().await);
        assert!(!engine.toggle().await);

        assert_eq!(
            events.recv().await.expect("event"),
            SessionEvent::RunStateChanged { running: true }
        );
        assert_eq!(
            events.recv().await.expect("event"),
            SessionEvent::RunStateChanged { running: false }
        );
    }
}
