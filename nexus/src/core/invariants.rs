//! Structural invariants of the goal forest.

use std::collections::HashSet;

use crate::core::params::SystemParameters;
use crate::core::store::GoalStore;
use crate::core::types::GoalStatus;

/// Check invariants that the scheduler must never break:
/// - No duplicate ids
/// - Every parent exists and children sit one level below it
/// - Parent chains terminate at a root
/// - Priority and confidence stay in range
/// - Only goals below the recursion limit have children
/// - At most one goal is `Analyzing`
/// - `Completed` goals carry an outcome, other goals do not
pub fn validate_invariants(store: &GoalStore, params: &SystemParameters) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for goal in store.all() {
        if !seen.insert(goal.id.as_str()) {
            errors.push(format!("duplicate id '{}'", goal.id));
        }

        match goal.parent_id.as_deref() {
            Some(parent_id) => match store.get(parent_id) {
                Some(parent) => {
                    if goal.depth != parent.depth + 1 {
                        errors.push(format!(
                            "{}: depth {} is not parent depth {} + 1",
                            goal.id, goal.depth, parent.depth
                        ));
                    }
                    if parent.depth >= params.recursion_limit {
                        errors.push(format!(
                            "{}: spawned under '{}' at depth {} (limit {})",
                            goal.id, parent.id, parent.depth, params.recursion_limit
                        ));
                    }
                }
                None => errors.push(format!("{}: parent '{}' not found", goal.id, parent_id)),
            },
            None if goal.depth != 0 => {
                errors.push(format!("{}: root must have depth 0", goal.id));
            }
            None => {}
        }

        if !reaches_root(store, &goal.id) {
            errors.push(format!("{}: parent chain does not reach a root", goal.id));
        }

        if !(1..=10).contains(&goal.priority) {
            errors.push(format!("{}: priority {} out of range", goal.id, goal.priority));
        }
        if goal.confidence_score > 100 {
            errors.push(format!(
                "{}: confidence {} out of range",
                goal.id, goal.confidence_score
            ));
        }

        match (goal.status, goal.outcome.is_some()) {
            (GoalStatus::Completed, false) => {
                errors.push(format!("{}: completed without outcome", goal.id));
            }
            (status, true) if status != GoalStatus::Completed => {
                errors.push(format!(
                    "{}: outcome set while {}",
                    goal.id,
                    status.as_str()
                ));
            }
            _ => {}
        }
    }

    let analyzing = store.with_status(GoalStatus::Analyzing).len();
    if analyzing > 1 {
        errors.push(format!("{analyzing} goals analyzing at once"));
    }

    errors
}

fn reaches_root(store: &GoalStore, id: &str) -> bool {
    let mut current = store.get(id);
    for _ in 0..=store.len() {
        match current {
            Some(goal) => match goal.parent_id.as_deref() {
                Some(parent_id) => current = store.get(parent_id),
                None => return true,
            },
            None => return false,
        }
    }
    false
}
