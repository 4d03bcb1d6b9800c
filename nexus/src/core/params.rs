//! Run-wide tunables passed to the analyzer on every cycle.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Lowest thinking budget the analyzer accepts.
pub const MIN_THINKING_BUDGET: u32 = 1024;
/// Highest thinking budget the analyzer accepts.
pub const MAX_THINKING_BUDGET: u32 = 24576;

/// Operator-editable parameters. Edits apply to future cycles only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemParameters {
    /// Divergence/creativity control, 0.0..=1.0.
    pub alpha: f32,
    /// Token budget for the analyzer's reasoning.
    pub beta: u32,
    /// Retention factor, 0.1..=1.0. Forwarded to the analyzer only.
    pub gamma: f32,
    /// Deepest depth at which a goal may still branch into sub-goals.
    pub recursion_limit: u32,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            beta: 8000,
            gamma: 0.8,
            recursion_limit: 3,
        }
    }
}

/// Inclusive bounds for `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for BetaBounds {
    fn default() -> Self {
        Self {
            min: MIN_THINKING_BUDGET,
            max: MAX_THINKING_BUDGET,
        }
    }
}

impl SystemParameters {
    pub fn validate(&self, bounds: BetaBounds) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            bail!("alpha must be within 0.0..=1.0 (got {})", self.alpha);
        }
        if !(0.1..=1.0).contains(&self.gamma) {
            bail!("gamma must be within 0.1..=1.0 (got {})", self.gamma);
        }
        if bounds.min > bounds.max {
            bail!(
                "beta bounds are inverted (min {} > max {})",
                bounds.min,
                bounds.max
            );
        }
        if self.beta < bounds.min || self.beta > bounds.max {
            bail!(
                "beta must be within {}..={} (got {})",
                bounds.min,
                bounds.max,
                self.beta
            );
        }
        Ok(())
    }
}
