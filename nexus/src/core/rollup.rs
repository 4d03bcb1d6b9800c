//! Completion rollup for goals waiting on their children.
//!
//! A `Reasoning` goal whose children are all `Completed` is completed in
//! turn, with an outcome aggregated from its children. The walk continues
//! upward so a whole branch can resolve from a single leaf.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::store::{GoalPatch, GoalStore};
use crate::core::types::{GoalId, GoalStatus};

/// Whether `Reasoning` parents are completed from their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupPolicy {
    /// Parents stay `Reasoning` forever.
    Disabled,
    #[default]
    ChildrenComplete,
}

/// A parent completed by the rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolledUp {
    pub id: GoalId,
    pub description: String,
    pub children: usize,
}

/// Complete every ancestor of `completed_id` whose children are all done.
///
/// Returns the parents completed, nearest first.
pub fn rollup_ancestors(store: &mut GoalStore, completed_id: &str) -> Result<Vec<RolledUp>> {
    let mut rolled = Vec::new();
    let mut current = completed_id.to_string();

    // Bounded by the store size so a malformed parent chain cannot loop.
    for _ in 0..store.len() {
        let Some(parent_id) = store.get(&current).and_then(|g| g.parent_id.clone()) else {
            break;
        };
        let Some(parent) = store.get(&parent_id) else {
            break;
        };
        if parent.status != GoalStatus::Reasoning {
            break;
        }
        let children = store.children_of(&parent_id);
        if children.is_empty()
            || children
                .iter()
                .any(|child| child.status != GoalStatus::Completed)
        {
            break;
        }

        let outcome = aggregate_outcome(store, &parent_id);
        let rolled_up = RolledUp {
            id: parent_id.clone(),
            description: parent.description.clone(),
            children: children.len(),
        };
        store.update(
            &parent_id,
            GoalPatch::status(GoalStatus::Completed).with_outcome(outcome),
        )?;
        rolled.push(rolled_up);
        current = parent_id;
    }

    Ok(rolled)
}

/// One `- <description>: <outcome>` line per child, in creation order.
pub fn aggregate_outcome(store: &GoalStore, parent_id: &str) -> String {
    store
        .children_of(parent_id)
        .iter()
        .map(|child| {
            format!(
                "- {}: {}",
                child.description,
                child.outcome.as_deref().unwrap_or("(no outcome)")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
