//! Deterministic selection logic for the goal forest.

use crate::core::store::GoalStore;
use crate::core::types::Goal;

/// Structured selection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome<'a> {
    /// Every goal is `Completed` (store non-empty).
    Complete,
    /// Nothing pending, but some goals are still waiting or failed.
    Idle,
    /// Pending goal selected for this cycle.
    Open(&'a Goal),
}

/// Pick the pending goal with the highest priority, newest first among ties.
///
/// Preferring the most recently created goal drives the engine down the
/// newest branch of the most urgent subtree before backtracking.
pub fn next_pending_goal(store: &GoalStore) -> Option<&Goal> {
    let pending = store.pending();
    let max_priority = pending.iter().map(|goal| goal.priority).max()?;
    pending
        .into_iter()
        .rev()
        .find(|goal| goal.priority == max_priority)
}

/// Classify the store and select the next goal when one is pending.
pub fn select_goal(store: &GoalStore) -> SelectOutcome<'_> {
    if let Some(goal) = next_pending_goal(store) {
        return SelectOutcome::Open(goal);
    }
    if store.all_completed() {
        SelectOutcome::Complete
    } else {
        SelectOutcome::Idle
    }
}
