//! In-memory goal forest.
//!
//! Goals are kept in creation order. Selection depends on that order for its
//! recency tie-break, so the store never reorders or removes individual goals.

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::types::{Goal, GoalId, GoalStatus, ROOT_CONFIDENCE, ROOT_PRIORITY};

/// Partial update merged into an existing goal.
///
/// `None` fields are left untouched, so applying the same patch twice has the
/// same effect as applying it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub status: Option<GoalStatus>,
    pub reasoning_trace: Option<String>,
    pub outcome: Option<String>,
    pub confidence_score: Option<u8>,
}

impl GoalPatch {
    pub fn status(status: GoalStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.reasoning_trace = Some(trace.into());
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence_score = Some(confidence);
        self
    }
}

/// Ordered, mutable collection of goals forming a forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStore {
    goals: Vec<Goal>,
}

impl GoalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Pending` goal and append it to the store.
    ///
    /// A child must reference an existing parent and sit exactly one level
    /// below it; a root must have depth 0.
    pub fn create(
        &mut self,
        description: impl Into<String>,
        parent_id: Option<&str>,
        depth: u32,
        priority: u8,
        confidence: u8,
    ) -> Result<Goal> {
        let description = description.into();
        if description.trim().is_empty() {
            bail!("goal description must not be empty");
        }
        if !(1..=10).contains(&priority) {
            bail!("priority must be within 1..=10 (got {priority})");
        }
        if confidence > 100 {
            bail!("confidence must be within 0..=100 (got {confidence})");
        }
        match parent_id {
            Some(parent_id) => {
                let parent = self
                    .get(parent_id)
                    .ok_or_else(|| anyhow!("parent goal '{parent_id}' not found"))?;
                if depth != parent.depth + 1 {
                    bail!(
                        "child depth {} must be parent depth {} + 1",
                        depth,
                        parent.depth
                    );
                }
            }
            None if depth != 0 => bail!("root goal must have depth 0 (got {depth})"),
            None => {}
        }

        let goal = Goal {
            id: Uuid::new_v4().to_string(),
            description,
            status: GoalStatus::Pending,
            parent_id: parent_id.map(str::to_string),
            depth,
            priority,
            confidence_score: confidence,
            reasoning_trace: None,
            outcome: None,
        };
        self.goals.push(goal.clone());
        Ok(goal)
    }

    /// Drop every goal and seed a single root for a new directive.
    pub fn reset_with_root(&mut self, description: impl Into<String>) -> Result<Goal> {
        let mut fresh = GoalStore::new();
        let root = fresh.create(description, None, 0, ROOT_PRIORITY, ROOT_CONFIDENCE)?;
        *self = fresh;
        Ok(root)
    }

    /// Merge `patch` into the goal with `id`.
    pub fn update(&mut self, id: &str, patch: GoalPatch) -> Result<()> {
        let goal = self
            .goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or_else(|| anyhow!("goal '{id}' not found"))?;
        if let Some(status) = patch.status {
            goal.status = status;
        }
        if let Some(trace) = patch.reasoning_trace {
            goal.reasoning_trace = Some(trace);
        }
        if let Some(outcome) = patch.outcome {
            goal.outcome = Some(outcome);
        }
        if let Some(confidence) = patch.confidence_score {
            goal.confidence_score = confidence.min(100);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|goal| goal.id == id)
    }

    /// All goals in creation order.
    pub fn all(&self) -> &[Goal] {
        &self.goals
    }

    /// `Pending` goals in creation order.
    pub fn pending(&self) -> Vec<&Goal> {
        self.with_status(GoalStatus::Pending)
    }

    pub fn with_status(&self, status: GoalStatus) -> Vec<&Goal> {
        self.goals.iter().filter(|g| g.status == status).collect()
    }

    pub fn children_of(&self, id: &str) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|goal| goal.parent_id.as_deref() == Some(id))
            .collect()
    }

    pub fn roots(&self) -> Vec<&Goal> {
        self.goals.iter().filter(|goal| goal.is_root()).collect()
    }

    /// True when the store is non-empty and every goal is `Completed`.
    pub fn all_completed(&self) -> bool {
        !self.goals.is_empty()
            && self
                .goals
                .iter()
                .all(|goal| goal.status == GoalStatus::Completed)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &GoalId> {
        self.goals.iter().map(|goal| &goal.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_child_requires_existing_parent_and_depth() {
        let mut store = GoalStore::new();
        let root = store.reset_with_root("root").expect("root");

        let err = store
            .create("orphan", Some("missing"), 1, 5, 50)
            .expect_err("missing parent");
        assert!(err.to_string().contains("parent goal 'missing' not found"));

        let err = store
            .create("too deep", Some(&root.id), 2, 5, 50)
            .expect_err("bad depth");
        assert!(err.to_string().contains("parent depth 0 + 1"));

        let child = store
            .create("child", Some(&root.id), 1, 8, 60)
            .expect("child");
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(store.children_of(&root.id).len(), 1);
    }

    #[test]
    fn reset_seeds_single_root() {
        let mut store = GoalStore::new();
        let first = store.reset_with_root("first").expect("root");
        store.create("child", Some(&first.id), 1, 5, 50).expect("child");

        let root = store.reset_with_root("second").expect("root");
        assert_eq!(store.len(), 1);
        assert_eq!(root.priority, ROOT_PRIORITY);
        assert_eq!(root.confidence_score, ROOT_CONFIDENCE);
        assert_eq!(root.depth, 0);
        assert_eq!(store.roots()[0].description, "second");
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut store = GoalStore::new();
        let root = store.reset_with_root("root").expect("root");

        let patch = GoalPatch::status(GoalStatus::Reasoning).with_trace("because");
        store.update(&root.id, patch.clone()).expect("update");
        store.update(&root.id, patch).expect("update again");
        store
            .update(&root.id, GoalPatch::default().with_confidence(70))
            .expect("confidence");

        let goal = store.get(&root.id).expect("goal");
        assert_eq!(goal.status, GoalStatus::Reasoning);
        assert_eq!(goal.reasoning_trace.as_deref(), Some("because"));
        assert_eq!(goal.confidence_score, 70);
        assert_eq!(goal.outcome, None);
    }

    #[test]
    fn update_unknown_goal_errors() {
        let mut store = GoalStore::new();
        let err = store
            .update("nope", GoalPatch::status(GoalStatus::Failed))
            .expect_err("unknown id");
        assert!(err.to_string().contains("goal 'nope' not found"));
    }

    #[test]
    fn all_completed_is_false_for_empty_store() {
        let mut store = GoalStore::new();
        assert!(!store.all_completed());
        let root = store.reset_with_root("root").expect("root");
        store
            .update(&root.id, GoalPatch::status(GoalStatus::Completed))
            .expect("update");
        assert!(store.all_completed());
    }
}
