//! Helpers for rendering goal paths and forest outlines.

use crate::core::store::GoalStore;
use crate::core::types::Goal;

/// Return the `/`-separated id path from the root down to `target_id`.
pub fn goal_path(store: &GoalStore, target_id: &str) -> Option<String> {
    let mut path = Vec::new();
    let mut current = store.get(target_id)?;
    for _ in 0..store.len() {
        path.push(current.id.clone());
        match current.parent_id.as_deref() {
            Some(parent_id) => current = store.get(parent_id)?,
            None => {
                path.reverse();
                return Some(path.join("/"));
            }
        }
    }
    None
}

/// Render the forest depth-first as an indented outline, capped at `max_goals` lines.
pub fn forest_summary(store: &GoalStore, max_goals: usize) -> String {
    let mut lines = Vec::new();
    for root in store.roots() {
        summarize_inner(store, root, max_goals, &mut lines);
    }
    if store.len() > lines.len() {
        lines.push(format!("... ({} more)", store.len() - lines.len()));
    }
    lines.join("\n")
}

fn summarize_inner(store: &GoalStore, goal: &Goal, max_goals: usize, lines: &mut Vec<String>) {
    if lines.len() >= max_goals {
        return;
    }
    let indent = "  ".repeat(goal.depth as usize);
    lines.push(format!(
        "{}- [{}] {} (priority={}, confidence={})",
        indent,
        goal.status.as_str(),
        goal.description,
        goal.priority,
        goal.confidence_score
    ));
    for child in store.children_of(&goal.id) {
        summarize_inner(store, child, max_goals, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_path_returns_root_to_target() {
        let mut store = GoalStore::new();
        let root = store.reset_with_root("root").expect("root");
        let child = store.create("child", Some(&root.id), 1, 5, 50).expect("child");
        assert_eq!(goal_path(&store, &root.id), Some(root.id.clone()));
        assert_eq!(
            goal_path(&store, &child.id),
            Some(format!("{}/{}", root.id, child.id))
        );
        assert_eq!(goal_path(&store, "missing"), None);
    }

    #[test]
    fn summary_indents_children_and_caps_output() {
        let mut store = GoalStore::new();
        let root = store.reset_with_root("Plan trip").expect("root");
        store.create("Book flight", Some(&root.id), 1, 8, 60).expect("a");
        store.create("Book hotel", Some(&root.id), 1, 6, 70).expect("b");

        let full = forest_summary(&store, 10);
        assert_eq!(
            full,
            "- [PENDING] Plan trip (priority=10, confidence=100)\n  \
             - [PENDING] Book flight (priority=8, confidence=60)\n  \
             - [PENDING] Book hotel (priority=6, confidence=70)"
        );

        let capped = forest_summary(&store, 2);
        assert!(capped.ends_with("... (1 more)"));
    }
}
