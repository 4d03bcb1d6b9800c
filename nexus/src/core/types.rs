//! Shared deterministic types for the goal engine.
//!
//! These types define stable contracts between the scheduler, the goal store
//! and the gateways. They carry no I/O and serialize with the camelCase field
//! names the analysis provider speaks.

use serde::{Deserialize, Serialize};

/// Identifier assigned to a goal at creation.
pub type GoalId = String;

/// Priority assigned to every user-supplied root goal.
pub const ROOT_PRIORITY: u8 = 10;
/// Priority used when the analyzer does not assign one.
pub const DEFAULT_PRIORITY: u8 = 5;
/// Confidence given to the user-supplied root goal.
pub const ROOT_CONFIDENCE: u8 = 100;
/// Confidence used when the analyzer does not predict one.
pub const DEFAULT_CONFIDENCE: u8 = 50;
/// Outcome recorded when the recursion limit forces completion.
pub const BEST_EFFORT_OUTCOME: &str = "Best effort logic applied due to depth limit.";

/// Lifecycle state of a goal.
///
/// `Completed` and `Failed` are terminal. `Reasoning` means the goal is
/// waiting on its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Pending,
    Analyzing,
    Reasoning,
    Completed,
    Failed,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GoalStatus::Completed | GoalStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Analyzing => "ANALYZING",
            GoalStatus::Reasoning => "REASONING",
            GoalStatus::Completed => "COMPLETED",
            GoalStatus::Failed => "FAILED",
        }
    }
}

/// A node in the decomposition forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalId,
    pub description: String,
    pub status: GoalStatus,
    pub parent_id: Option<GoalId>,
    pub depth: u32,
    /// 1..=10, higher is more urgent.
    pub priority: u8,
    /// 0..=100.
    pub confidence_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl Goal {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Sub-goal descriptor proposed by the analyzer.
///
/// Numeric fields are kept wide and optional so that out-of-range provider
/// output can be normalized instead of rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoalSpec {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_confidence: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

/// Structured output of one analyzer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub has_knowledge_gaps: bool,
    pub reasoning: String,
    pub analysis_confidence: i64,
    #[serde(default)]
    pub sub_goals: Vec<SubGoalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_solution: Option<String>,
}

impl AnalysisResult {
    /// Analysis that resolves the goal directly.
    pub fn solved(reasoning: impl Into<String>, confidence: i64, solution: impl Into<String>) -> Self {
        Self {
            has_knowledge_gaps: false,
            reasoning: reasoning.into(),
            analysis_confidence: confidence,
            sub_goals: Vec::new(),
            direct_solution: Some(solution.into()),
        }
    }

    /// Analysis that reports gaps and proposes sub-goals.
    pub fn gaps(reasoning: impl Into<String>, confidence: i64, sub_goals: Vec<SubGoalSpec>) -> Self {
        Self {
            has_knowledge_gaps: true,
            reasoning: reasoning.into(),
            analysis_confidence: confidence,
            sub_goals,
            direct_solution: None,
        }
    }
}
