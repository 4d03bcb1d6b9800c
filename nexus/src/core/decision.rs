//! Branch decision for an analyzed goal.
//!
//! Turns a raw analyzer result into one of three outcomes: forced best-effort
//! completion, branching into children, or a direct solution. Provider
//! numbers are normalized here so the store only ever sees in-range values.

use crate::core::analysis_validator::{AnalysisBranch, branch_for, validate_analysis};
use crate::core::types::{AnalysisResult, DEFAULT_CONFIDENCE, DEFAULT_PRIORITY, Goal, SubGoalSpec};

/// Child goal to create under the analyzed goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub description: String,
    pub priority: u8,
    pub confidence: u8,
}

impl From<&SubGoalSpec> for ChildSpec {
    fn from(spec: &SubGoalSpec) -> Self {
        Self {
            description: spec.description.trim().to_string(),
            priority: normalize_priority(spec.priority),
            // Zero means unassigned, as it does for priority.
            confidence: normalize_confidence(
                spec.predicted_confidence.filter(|&c| c != 0),
                DEFAULT_CONFIDENCE,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Gaps remain but the goal sits at the recursion limit.
    Fallback,
    Branch(Vec<ChildSpec>),
    Solve(String),
}

/// Fully normalized analysis ready to apply to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAnalysis {
    pub decision: Decision,
    pub reasoning: String,
    pub confidence: u8,
}

/// Decide what to do with `goal` given its analysis.
///
/// Returns the validation errors joined into one message when the analysis
/// is not usable for the branch it selects.
pub fn decide(
    goal: &Goal,
    analysis: &AnalysisResult,
    recursion_limit: u32,
) -> Result<AppliedAnalysis, String> {
    let branch = branch_for(analysis, goal.depth, recursion_limit);
    let errors = validate_analysis(analysis, branch);
    if !errors.is_empty() {
        return Err(format!("unusable analysis: {}", errors.join("; ")));
    }

    let decision = match branch {
        AnalysisBranch::Fallback => Decision::Fallback,
        AnalysisBranch::Branch => {
            Decision::Branch(analysis.sub_goals.iter().map(ChildSpec::from).collect())
        }
        AnalysisBranch::Solve => {
            Decision::Solve(analysis.direct_solution.clone().unwrap_or_default())
        }
    };

    Ok(AppliedAnalysis {
        decision,
        reasoning: analysis.reasoning.clone(),
        confidence: normalize_confidence(Some(analysis.analysis_confidence), DEFAULT_CONFIDENCE),
    })
}

/// Missing or zero priority means "unassigned"; anything else is clamped to 1..=10.
pub fn normalize_priority(raw: Option<i64>) -> u8 {
    match raw {
        None | Some(0) => DEFAULT_PRIORITY,
        Some(value) => value.clamp(1, 10) as u8,
    }
}

pub fn normalize_confidence(raw: Option<i64>, default: u8) -> u8 {
    match raw {
        None => default,
        Some(value) => value.clamp(0, 100) as u8,
    }
}
