//! Engine lifecycle scenarios driven through scripted gateways.
//!
//! Each test submits a directive, starts the run and drives cycles directly
//! (or through the controller), then inspects the session snapshot.

use std::sync::Arc;
use std::time::Duration;

use nexus::controller::{LoopStop, RunController};
use nexus::core::event_log::LogKind;
use nexus::core::params::SystemParameters;
use nexus::core::rollup::RollupPolicy;
use nexus::core::types::{AnalysisResult, BEST_EFFORT_OUTCOME, Goal, GoalStatus};
use nexus::engine::{
    ALL_COMPLETED, CycleOutcome, Engine, EngineOptions, RECURSION_LIMIT_REACHED, SkipReason,
};
use nexus::session::SessionSnapshot;
use nexus::test_support::{FnAnalyzer, ScriptedAnalyzer, ScriptedSynthesizer, engine_with, sub_goal};

fn params_with_limit(recursion_limit: u32) -> SystemParameters {
    SystemParameters {
        recursion_limit,
        ..SystemParameters::default()
    }
}

fn options(rollup: RollupPolicy) -> EngineOptions {
    EngineOptions {
        rollup,
        ..EngineOptions::default()
    }
}

async fn started(engine: &Arc<Engine>, directive: &str) {
    engine.submit_directive(directive).await.expect("directive");
    engine.start().await;
}

fn goal<'a>(snapshot: &'a SessionSnapshot, description: &str) -> &'a Goal {
    snapshot
        .goals
        .iter()
        .find(|goal| goal.description == description)
        .unwrap_or_else(|| panic!("goal {description:?} not found"))
}

fn two_cycle_script() -> ScriptedAnalyzer {
    ScriptedAnalyzer::new(vec![
        Ok(AnalysisResult::gaps("need detail", 40, vec![sub_goal("A.1", 8, 60)])),
        Ok(AnalysisResult::solved("known", 90, "X")),
    ])
}

/// Without rollup the parent stays REASONING and the run never stops itself.
#[tokio::test]
async fn branch_then_solve_without_rollup_leaves_parent_reasoning() {
    let engine = engine_with(
        two_cycle_script(),
        ScriptedSynthesizer::default(),
        params_with_limit(1),
        options(RollupPolicy::Disabled),
    );
    started(&engine, "A").await;

    let first = engine.run_cycle().await.expect("cycle 1");
    assert!(matches!(first, CycleOutcome::Branched { spawned: 1, .. }));
    let snapshot = engine.snapshot().await;
    let root = goal(&snapshot, "A");
    let child = goal(&snapshot, "A.1");
    assert_eq!(root.status, GoalStatus::Reasoning);
    assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
    assert_eq!((child.depth, child.priority, child.confidence_score), (1, 8, 60));

    let second = engine.run_cycle().await.expect("cycle 2");
    assert!(matches!(second, CycleOutcome::Solved { rolled_up: 0, .. }));
    let snapshot = engine.snapshot().await;
    let child = goal(&snapshot, "A.1");
    assert_eq!(child.status, GoalStatus::Completed);
    assert_eq!(child.outcome.as_deref(), Some("X"));
    assert!(snapshot.context.contains("[New Fact]: X..."));

    let third = engine.run_cycle().await.expect("cycle 3");
    assert_eq!(third, CycleOutcome::Idle);
    assert!(engine.is_running().await);
    assert_eq!(goal(&engine.snapshot().await, "A").status, GoalStatus::Reasoning);
}

#[tokio::test]
async fn branch_then_solve_with_rollup_completes_and_stops() {
    let engine = engine_with(
        two_cycle_script(),
        ScriptedSynthesizer::default(),
        params_with_limit(1),
        options(RollupPolicy::ChildrenComplete),
    );
    started(&engine, "A").await;

    engine.run_cycle().await.expect("cycle 1");
    let second = engine.run_cycle().await.expect("cycle 2");
    assert!(matches!(second, CycleOutcome::Solved { rolled_up: 1, .. }));

    let snapshot = engine.snapshot().await;
    let root = goal(&snapshot, "A");
    assert_eq!(root.status, GoalStatus::Completed);
    assert_eq!(root.outcome.as_deref(), Some("- A.1: X"));
    assert!(snapshot.logs.iter().any(|entry| entry.kind == LogKind::Action
        && entry.message == "Sub-goals resolved. Rolled up \"A\" from 1 completed sub-goals."));

    let third = engine.run_cycle().await.expect("cycle 3");
    assert_eq!(third, CycleOutcome::Complete);
    assert!(!engine.is_running().await);
    let snapshot = engine.snapshot().await;
    let last = snapshot.logs.last().expect("log");
    assert_eq!((last.kind, last.message.as_str()), (LogKind::Info, ALL_COMPLETED));

    // Stopped runs do nothing.
    let fourth = engine.run_cycle().await.expect("cycle 4");
    assert_eq!(fourth, CycleOutcome::Skipped(SkipReason::NotRunning));
}

/// Highest priority first; among equals the most recently created wins.
#[tokio::test]
async fn selection_prefers_priority_then_recency() {
    let analyzer = ScriptedAnalyzer::new(vec![
        Ok(AnalysisResult::gaps(
            "split",
            50,
            vec![
                sub_goal("g1", 3, 50),
                sub_goal("g2", 3, 50),
                sub_goal("g3", 7, 50),
                sub_goal("g4", 7, 50),
                sub_goal("g5", 1, 50),
            ],
        )),
        Ok(AnalysisResult::solved("known", 90, "done")),
        Ok(AnalysisResult::solved("known", 90, "done")),
        Ok(AnalysisResult::solved("known", 90, "done")),
    ]);
    let calls = analyzer.calls();
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        params_with_limit(3),
        EngineOptions::default(),
    );
    started(&engine, "root").await;

    for _ in 0..4 {
        engine.run_cycle().await.expect("cycle");
    }

    let order: Vec<String> = calls
        .lock()
        .expect("calls lock")
        .iter()
        .map(|call| call.description.clone())
        .collect();
    assert_eq!(order, vec!["root", "g4", "g3", "g2"]);
}

#[tokio::test]
async fn depth_limit_forces_best_effort_completion() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(AnalysisResult::gaps(
        "still unsure",
        20,
        vec![sub_goal("never spawned", 9, 50)],
    ))]);
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        params_with_limit(0),
        EngineOptions::default(),
    );
    started(&engine, "root").await;

    let outcome = engine.run_cycle().await.expect("cycle");
    assert!(matches!(outcome, CycleOutcome::Fallback { .. }));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.goals.len(), 1);
    let root = &snapshot.goals[0];
    assert_eq!(root.status, GoalStatus::Completed);
    assert_eq!(root.outcome.as_deref(), Some(BEST_EFFORT_OUTCOME));
    assert_eq!(root.reasoning_trace.as_deref(), Some("still unsure"));
    assert!(snapshot.logs.iter().any(|entry| entry.kind == LogKind::Error
        && entry.message == RECURSION_LIMIT_REACHED));
    // The fallback is not a failure.
    assert!(snapshot.running);
    assert_eq!(engine.run_cycle().await.expect("cycle"), CycleOutcome::Complete);
}

/// Two triggers racing while one cycle is in flight advance exactly one goal.
#[tokio::test]
async fn concurrent_triggers_are_single_flight() {
    let analyzer = ScriptedAnalyzer::new(vec![
        Ok(AnalysisResult::gaps(
            "split",
            50,
            vec![sub_goal("a", 5, 50), sub_goal("b", 5, 50)],
        )),
        Ok(AnalysisResult::solved("known", 90, "done")),
        Ok(AnalysisResult::solved("known", 90, "done")),
    ])
    .with_delay(Duration::from_millis(50));
    let calls = analyzer.calls();
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        params_with_limit(3),
        options(RollupPolicy::Disabled),
    );
    started(&engine, "root").await;
    engine.run_cycle().await.expect("branch");

    let (first, second) = tokio::join!(engine.run_cycle(), engine.run_cycle());
    let outcomes = [first.expect("first"), second.expect("second")];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == CycleOutcome::Skipped(SkipReason::InFlight))
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, CycleOutcome::Solved { .. }))
            .count(),
        1
    );
    let snapshot = engine.snapshot().await;
    let pending = snapshot
        .goals
        .iter()
        .filter(|goal| goal.status == GoalStatus::Pending)
        .count();
    assert_eq!(pending, 1);
    assert_eq!(calls.lock().expect("calls lock").len(), 2);
    assert!(!engine.is_cycle_in_flight());
}

#[tokio::test]
async fn analyzer_failure_halts_the_run() {
    let analyzer = ScriptedAnalyzer::new(vec![Err("No response from model".to_string())]);
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        SystemParameters::default(),
        EngineOptions::default(),
    );
    started(&engine, "root").await;

    let outcome = engine.run_cycle().await.expect("cycle");
    assert!(matches!(outcome, CycleOutcome::Failed { .. }));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.goals[0].status, GoalStatus::Failed);
    assert!(!snapshot.running);
    let last = snapshot.logs.last().expect("log");
    assert_eq!(last.kind, LogKind::Error);
    assert_eq!(last.message, "Cycle failed: analyzer failed: No response from model");
    assert_eq!(
        engine.run_cycle().await.expect("cycle"),
        CycleOutcome::Skipped(SkipReason::NotRunning)
    );
}

#[tokio::test]
async fn parameter_changes_apply_to_the_next_cycle() {
    let analyzer = ScriptedAnalyzer::new(vec![
        Ok(AnalysisResult::gaps("split", 50, vec![sub_goal("a", 5, 50)])),
        Ok(AnalysisResult::solved("known", 90, "done")),
    ]);
    let calls = analyzer.calls();
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        SystemParameters::default(),
        EngineOptions::default(),
    );
    started(&engine, "root").await;

    engine.run_cycle().await.expect("cycle 1");
    let tuned = SystemParameters {
        beta: 16_000,
        alpha: 0.2,
        ..SystemParameters::default()
    };
    engine.set_params(tuned).await.expect("params");
    let rejected = SystemParameters {
        gamma: 0.0,
        ..tuned
    };
    assert!(engine.set_params(rejected).await.is_err());
    engine.run_cycle().await.expect("cycle 2");

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls[0].params, SystemParameters::default());
    assert_eq!(calls[1].params, tuned);
}

/// A deterministic analyzer that branches twice per goal until depth 2.
/// The run must terminate with every goal completed and the forest intact.
#[tokio::test]
async fn full_decomposition_terminates_with_valid_forest() {
    let analyzer = FnAnalyzer::new(|goal: &Goal| {
        if goal.depth < 2 {
            AnalysisResult::gaps(
                "split",
                60,
                vec![
                    sub_goal(&format!("{}/left", goal.description), 6, 50),
                    sub_goal(&format!("{}/right", goal.description), 4, 50),
                ],
            )
        } else {
            AnalysisResult::solved("leaf", 80, format!("answer for {}", goal.description))
        }
    });
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        params_with_limit(3),
        EngineOptions::default(),
    );
    engine.submit_directive("root").await.expect("directive");

    let controller = RunController::new(Arc::clone(&engine), Duration::ZERO);
    let mut reported = 0;
    let outcome = controller
        .run_until_stopped(100, |_| reported += 1)
        .await
        .expect("run");

    assert_eq!(outcome.stop, LoopStop::Complete);
    // 1 root + 2 + 4 goals, one cycle each.
    assert_eq!(outcome.cycles_executed, 7);
    assert_eq!(reported, 8);

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.goals.len(), 7);
    assert!(snapshot.goals.iter().all(|goal| goal.status == GoalStatus::Completed));
    assert!(snapshot.goals.iter().all(|goal| goal.depth <= 2));
    assert!(engine.invariant_errors().await.is_empty());
    assert_eq!(snapshot.context.matches("[New Fact]: ").count(), 4);
    assert!(snapshot.context.starts_with("System Initialized. Goal Acquired."));
}

/// Facts are only ever appended: each context is a prefix of the next.
#[tokio::test]
async fn context_grows_append_only() {
    let analyzer = FnAnalyzer::new(|goal: &Goal| {
        if goal.depth == 0 {
            AnalysisResult::gaps(
                "split",
                60,
                vec![sub_goal("first", 6, 50), sub_goal("second", 4, 50)],
            )
        } else {
            AnalysisResult::solved("leaf", 80, format!("fact about {}", goal.description))
        }
    });
    let engine = engine_with(
        analyzer,
        ScriptedSynthesizer::default(),
        params_with_limit(3),
        EngineOptions::default(),
    );
    started(&engine, "root").await;

    let mut previous = engine.snapshot().await.context;
    for _ in 0..3 {
        engine.run_cycle().await.expect("cycle");
        let current = engine.snapshot().await.context;
        assert!(current.starts_with(&previous));
        previous = current;
    }
    assert!(previous.ends_with("[New Fact]: fact about first...\n[New Fact]: fact about second..."));
    assert!(!previous.contains("fact about root"));
}
