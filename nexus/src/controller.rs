//! Run controller: drives scheduler cycles on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::core::types::GoalId;
use crate::engine::{CycleOutcome, Engine, SkipReason};

/// `tokio::time::interval` rejects a zero period.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Reason why `run_until_stopped` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// Every goal completed.
    Complete,
    /// A gateway failure halted the run.
    Failed { goal_id: GoalId, error: String },
    /// Nothing pending, but some goal can never complete.
    Stalled,
    /// The cycle limit was reached with work left.
    MaxCycles { max_cycles: u32 },
    /// Someone else stopped the run.
    Stopped,
}

/// Summary of a controller run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Cycles that analyzed a goal.
    pub cycles_executed: u32,
    pub stop: LoopStop,
}

pub struct RunController {
    engine: Arc<Engine>,
    interval: Duration,
}

impl RunController {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Start the run and cycle until it stops itself, fails, stalls or
    /// reaches `max_cycles`.
    pub async fn run_until_stopped<F: FnMut(&CycleOutcome)>(
        &self,
        max_cycles: u32,
        mut on_cycle: F,
    ) -> Result<LoopOutcome> {
        self.engine.start().await;
        let mut ticker = interval(self.interval.max(MIN_TICK));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles_executed = 0u32;
        loop {
            ticker.tick().await;
            if cycles_executed >= max_cycles {
                self.engine.stop().await;
                return Ok(LoopOutcome {
                    cycles_executed,
                    stop: LoopStop::MaxCycles { max_cycles },
                });
            }

            let outcome = self.stop_on_error(self.engine.run_cycle().await).await?;
            let stop = match &outcome {
                CycleOutcome::Skipped(SkipReason::InFlight) => continue,
                CycleOutcome::Skipped(SkipReason::NotRunning) => Some(LoopStop::Stopped),
                CycleOutcome::Complete => Some(LoopStop::Complete),
                CycleOutcome::Idle => {
                    self.engine.stop().await;
                    Some(LoopStop::Stalled)
                }
                CycleOutcome::Failed { goal_id, error } => {
                    cycles_executed += 1;
                    Some(LoopStop::Failed {
                        goal_id: goal_id.clone(),
                        error: error.clone(),
                    })
                }
                CycleOutcome::Branched { .. }
                | CycleOutcome::Solved { .. }
                | CycleOutcome::Fallback { .. }
                | CycleOutcome::Superseded { .. } => {
                    cycles_executed += 1;
                    None
                }
            };
            on_cycle(&outcome);
            if let Some(stop) = stop {
                info!(cycles_executed, ?stop, "run finished");
                return Ok(LoopOutcome {
                    cycles_executed,
                    stop,
                });
            }
        }
    }

    /// An errored cycle must not leave the run flagged as active.
    async fn stop_on_error(&self, result: Result<CycleOutcome>) -> Result<CycleOutcome> {
        if let Err(err) = &result {
            warn!(err = %format!("{err:#}"), "cycle errored, stopping run");
            self.engine.stop().await;
        }
        result
    }

    /// Cycle forever in the background, acting only while the run is on.
    ///
    /// Used by long-lived front-ends where the operator toggles the run.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval.max(MIN_TICK));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.engine.run_cycle().await {
                    Ok(CycleOutcome::Skipped(_)) => {}
                    Ok(outcome) => debug!(?outcome, "cycle finished"),
                    Err(err) => warn!(err = %format!("{err:#}"), "cycle errored"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::SystemParameters;
    use crate::core::types::AnalysisResult;
    use crate::engine::EngineOptions;
    use crate::test_support::{ScriptedAnalyzer, ScriptedSynthesizer, engine_with, sub_goal};

    fn controller(analyzer: ScriptedAnalyzer, options: EngineOptions) -> RunController {
        let engine = engine_with(
            analyzer,
            ScriptedSynthesizer::default(),
            SystemParameters::default(),
            options,
        );
        RunController::new(engine, Duration::ZERO)
    }

    #[tokio::test]
    async fn runs_to_completion() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::solved("known", 90, "X"))]);
        let controller = controller(analyzer, EngineOptions::default());
        controller
            .engine()
            .submit_directive("goal")
            .await
            .expect("directive");

        let mut seen = Vec::new();
        let outcome = controller
            .run_until_stopped(10, |cycle| seen.push(cycle.clone()))
            .await
            .expect("run");

        assert_eq!(outcome.stop, LoopStop::Complete);
        assert_eq!(outcome.cycles_executed, 1);
        assert_eq!(seen.len(), 2);
        assert!(!controller.engine().is_running().await);
    }

    #[tokio::test]
    async fn reports_failure() {
        let analyzer = ScriptedAnalyzer::new(vec![Err("No response from model".to_string())]);
        let controller = controller(analyzer, EngineOptions::default());
        controller
            .engine()
            .submit_directive("goal")
            .await
            .expect("directive");

        let outcome = controller.run_until_stopped(10, |_| {}).await.expect("run");

        let LoopStop::Failed { error, .. } = outcome.stop else {
            panic!("expected failure, got {:?}", outcome.stop);
        };
        assert_eq!(error, "analyzer failed: No response from model");
    }

    #[tokio::test]
    async fn stops_at_cycle_limit() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::gaps(
            "split",
            40,
            vec![sub_goal("a", 5, 50)],
        ))]);
        let controller = controller(analyzer, EngineOptions::default());
        controller
            .engine()
            .submit_directive("goal")
            .await
            .expect("directive");

        let outcome = controller.run_until_stopped(1, |_| {}).await.expect("run");

        assert_eq!(outcome.stop, LoopStop::MaxCycles { max_cycles: 1 });
        assert!(!controller.engine().is_running().await);
    }

    #[tokio::test]
    async fn cycle_error_stops_the_run() {
        let controller = controller(ScriptedAnalyzer::new(Vec::new()), EngineOptions::default());
        controller.engine().start().await;

        let result = controller
            .stop_on_error(Err(anyhow::anyhow!("store rejected update")))
            .await;

        assert_eq!(
            result.expect_err("error passes through").to_string(),
            "store rejected update"
        );
        assert!(!controller.engine().is_running().await);

        controller.engine().start().await;
        let result = controller.stop_on_error(Ok(CycleOutcome::Idle)).await;
        assert_eq!(result.expect("ok"), CycleOutcome::Idle);
        assert!(controller.engine().is_running().await);
    }

    #[tokio::test]
    async fn empty_store_stalls() {
        let controller = controller(ScriptedAnalyzer::new(Vec::new()), EngineOptions::default());
        let outcome = controller.run_until_stopped(5, |_| {}).await.expect("run");
        assert_eq!(outcome.stop, LoopStop::Stalled);
        assert_eq!(outcome.cycles_executed, 0);
    }
}
