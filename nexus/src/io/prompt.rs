//! Prompt builder for the command-backed gateways.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::core::params::SystemParameters;
use crate::core::types::Goal;

const ANALYZER_TEMPLATE: &str = include_str!("prompts/analyzer.md");
const SYNTHESIZER_TEMPLATE: &str = include_str!("prompts/synthesizer.md");

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->")
        .expect("section marker regex should be valid")
});

const TRUNCATION_MARKER: &str = "\n[truncated]";

#[derive(Debug, Clone, Serialize)]
struct GoalContext<'a> {
    description: &'a str,
    depth: u32,
    priority: u8,
    confidence: u8,
}

/// Floats are pre-formatted so the prompt shows `0.7`, not its f64 widening.
#[derive(Debug, Clone, Serialize)]
struct ParamsContext {
    alpha: String,
    beta: u32,
    gamma: String,
    recursion_limit: u32,
}

impl From<&SystemParameters> for ParamsContext {
    fn from(params: &SystemParameters) -> Self {
        Self {
            alpha: format!("{:.2}", params.alpha),
            beta: params.beta,
            gamma: format!("{:.2}", params.gamma),
            recursion_limit: params.recursion_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CompletedContext<'a> {
    description: &'a str,
    outcome: &'a str,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("analyzer", ANALYZER_TEMPLATE)
            .expect("analyzer template should be valid");
        env.add_template("synthesizer", SYNTHESIZER_TEMPLATE)
            .expect("synthesizer template should be valid");
        Self { env }
    }

    fn render_analyzer(&self, goal: &Goal, context: &str, params: &SystemParameters) -> Result<String> {
        let template = self.env.get_template("analyzer")?;
        let rendered = template.render(context! {
            goal => GoalContext {
                description: goal.description.trim(),
                depth: goal.depth,
                priority: goal.priority,
                confidence: goal.confidence_score,
            },
            params => ParamsContext::from(params),
            at_limit => goal.depth >= params.recursion_limit,
            context => context.trim(),
        })?;
        Ok(rendered)
    }

    fn render_synthesizer(&self, completed: &[&Goal], params: &SystemParameters) -> Result<String> {
        let completed: Vec<CompletedContext<'_>> = completed
            .iter()
            .map(|goal| CompletedContext {
                description: goal.description.trim(),
                outcome: goal.outcome.as_deref().unwrap_or_default().trim(),
            })
            .collect();
        let template = self.env.get_template("synthesizer")?;
        let rendered = template.render(context! {
            completed => completed,
            params => ParamsContext::from(params),
        })?;
        Ok(rendered)
    }
}

/// A section of rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    content: String,
}

/// Split rendered output on `<!-- section:KEY required|droppable -->` markers.
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    let markers: Vec<(usize, usize, String, bool)> = SECTION_RE
        .captures_iter(rendered)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str().to_string();
            let required = caps.get(2)?.as_str() == "required";
            Some((whole.start(), whole.end(), key, required))
        })
        .collect();

    let mut sections = Vec::new();
    for (idx, (_, content_start, key, required)) in markers.iter().enumerate() {
        let content_end = markers
            .get(idx + 1)
            .map_or(rendered.len(), |(next_start, ..)| *next_start);
        let content = rendered[*content_start..content_end].trim().to_string();
        if !content.is_empty() || *required {
            sections.push(ParsedSection {
                key: key.clone(),
                required: *required,
                content,
            });
        }
    }
    sections
}

fn total_len(sections: &[ParsedSection]) -> usize {
    sections.iter().map(|s| s.content.len()).sum()
}

/// Fit sections into `budget` bytes.
///
/// Droppable sections go first, in template order, except the last section,
/// which is truncated instead so its head survives.
fn apply_budget(sections: &mut Vec<ParsedSection>, budget: usize) {
    while total_len(sections) > budget {
        let last = sections.len().saturating_sub(1);
        let Some(idx) = sections
            .iter()
            .take(last)
            .position(|section| !section.required)
        else {
            break;
        };
        let dropped = sections.remove(idx);
        debug!(
            section = dropped.key,
            bytes_dropped = dropped.content.len(),
            "dropped section for budget"
        );
    }

    if total_len(sections) <= budget {
        return;
    }
    let Some((last, rest)) = sections.split_last_mut() else {
        return;
    };
    let allowed = budget.saturating_sub(total_len(rest));
    let before_len = last.content.len();
    if allowed > TRUNCATION_MARKER.len() {
        truncate_at_char_boundary(&mut last.content, allowed - TRUNCATION_MARKER.len());
        last.content.push_str(TRUNCATION_MARKER);
    } else {
        truncate_at_char_boundary(&mut last.content, allowed);
    }
    debug!(
        section = last.key,
        before_len,
        after_len = last.content.len(),
        "truncated section for budget"
    );
}

fn truncate_at_char_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds gateway prompts within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build_analyzer(
        &self,
        goal: &Goal,
        context: &str,
        params: &SystemParameters,
    ) -> Result<String> {
        let rendered = PromptEngine::new().render_analyzer(goal, context, params)?;
        Ok(self.fit(&rendered))
    }

    /// `completed` should hold only goals with an outcome.
    pub fn build_synthesizer(&self, completed: &[&Goal], params: &SystemParameters) -> Result<String> {
        let rendered = PromptEngine::new().render_synthesizer(completed, params)?;
        Ok(self.fit(&rendered))
    }

    fn fit(&self, rendered: &str) -> String {
        let mut sections = parse_sections(rendered);
        apply_budget(&mut sections, self.budget_bytes);
        render_sections(&sections)
    }
}
