//! Append-only knowledge context shared with the analyzer.

use serde::{Deserialize, Serialize};

/// Context text before any directive has been submitted.
pub const INITIAL_CONTEXT: &str = "System Initialized. No external data.";
/// Context text right after a new directive is submitted.
pub const DIRECTIVE_CONTEXT: &str = "System Initialized. Goal Acquired.";

/// Growing text memory of facts learned during a run.
///
/// Within a run the text only grows: every snapshot is a prefix of every
/// later snapshot. `reset` is reserved for new directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeContext {
    text: String,
}

impl Default for KnowledgeContext {
    fn default() -> Self {
        Self::new(INITIAL_CONTEXT)
    }
}

impl KnowledgeContext {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { text: seed.into() }
    }

    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Append a fact on its own line.
    pub fn append(&mut self, fact: &str) {
        self.text.push('\n');
        self.text.push_str(fact);
    }

    pub fn reset(&mut self, seed: impl Into<String>) {
        self.text = seed.into();
    }
}

/// Render the bounded `[New Fact]` line for a direct solution.
///
/// Keeps the first `max_chars` characters (not bytes) of `solution`.
pub fn fact_excerpt(solution: &str, max_chars: usize) -> String {
    let excerpt: String = solution.chars().take(max_chars).collect();
    format!("[New Fact]: {excerpt}...")
}

/// Render a synthesizer summary as a context line.
pub fn synthesis_entry(summary: &str) -> String {
    format!("[Synthesis]: {}", summary.trim())
}
