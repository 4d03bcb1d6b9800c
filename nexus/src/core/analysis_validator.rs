//! Analysis consistency invariants.
//!
//! Validates that an analyzer result is usable for the branch it selects:
//! - gaps below the recursion limit require at least one described sub-goal.
//! - no gaps requires a non-empty direct solution.

use crate::core::types::AnalysisResult;

/// Which branch the analysis will drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisBranch {
    /// Gaps at or past the recursion limit. Sub-goals are ignored.
    Fallback,
    Branch,
    Solve,
}

pub fn branch_for(analysis: &AnalysisResult, depth: u32, recursion_limit: u32) -> AnalysisBranch {
    match (analysis.has_knowledge_gaps, depth >= recursion_limit) {
        (true, true) => AnalysisBranch::Fallback,
        (true, false) => AnalysisBranch::Branch,
        (false, _) => AnalysisBranch::Solve,
    }
}

/// Validate `analysis` for the branch it selects.
///
/// Returns a list of stable error messages (empty on success).
pub fn validate_analysis(analysis: &AnalysisResult, branch: AnalysisBranch) -> Vec<String> {
    let mut errors = Vec::new();

    match branch {
        AnalysisBranch::Fallback => {}
        AnalysisBranch::Branch => {
            if analysis.sub_goals.is_empty() {
                errors.push("analysis reported knowledge gaps but proposed no sub-goals".to_string());
            }
            for (idx, spec) in analysis.sub_goals.iter().enumerate() {
                if spec.description.trim().is_empty() {
                    errors.push(format!("sub-goal {idx} has an empty description"));
                }
            }
        }
        AnalysisBranch::Solve => {
            let solution = analysis.direct_solution.as_deref().map(str::trim);
            if solution.is_none_or(str::is_empty) {
                errors.push(
                    "analysis reported no knowledge gaps but provided no direct solution"
                        .to_string(),
                );
            }
        }
    }

    errors
}
