//! Mutable state of one operator session.
//!
//! A session owns the goal forest, the audit log, the knowledge context, the
//! current parameters and the running flag. It is driven by the
//! [`Engine`](crate::engine::Engine), which serializes access to it.

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use crate::core::context::{DIRECTIVE_CONTEXT, KnowledgeContext};
use crate::core::event_log::{EventLog, LogEntry, LogKind};
use crate::core::params::{BetaBounds, SystemParameters};
use crate::core::store::GoalStore;
use crate::core::types::Goal;

pub const DIRECTIVE_RECEIVED: &str = "New Directive Received. Initializing Reasoning Loop.";

#[derive(Debug, Clone)]
pub struct Session {
    store: GoalStore,
    log: EventLog,
    context: KnowledgeContext,
    params: SystemParameters,
    beta_bounds: BetaBounds,
    running: bool,
}

/// Read-only copy of a session for observers and transcripts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub goals: Vec<Goal>,
    pub logs: Vec<LogEntry>,
    pub context: String,
    pub params: SystemParameters,
    pub running: bool,
}

impl Session {
    pub fn new(params: SystemParameters, beta_bounds: BetaBounds) -> Result<Self> {
        params.validate(beta_bounds)?;
        Ok(Self {
            store: GoalStore::new(),
            log: EventLog::new(),
            context: KnowledgeContext::default(),
            params,
            beta_bounds,
            running: false,
        })
    }

    /// Replace the forest with a single root goal for `text`.
    ///
    /// The log is cleared and the context reset. The running flag is left
    /// as it is.
    pub fn submit_directive(&mut self, text: &str) -> Result<Goal> {
        let text = text.trim();
        if text.is_empty() {
            bail!("directive must not be empty");
        }
        let root = self.store.reset_with_root(text)?;
        self.log.clear();
        self.context.reset(DIRECTIVE_CONTEXT);
        self.log.append(LogKind::Info, DIRECTIVE_RECEIVED, None);
        info!(root_id = %root.id, "directive submitted");
        Ok(root)
    }

    /// Validate and apply new parameters. Invalid input leaves the old values.
    pub fn set_params(&mut self, params: SystemParameters) -> Result<()> {
        params.validate(self.beta_bounds)?;
        self.params = params;
        Ok(())
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn params(&self) -> &SystemParameters {
        &self.params
    }

    pub fn beta_bounds(&self) -> BetaBounds {
        self.beta_bounds
    }

    pub fn store(&self) -> &GoalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GoalStore {
        &mut self.store
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn context(&self) -> &KnowledgeContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut KnowledgeContext {
        &mut self.context
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            goals: self.store.all().to_vec(),
            logs: self.log.entries().to_vec(),
            context: self.context.snapshot(),
            params: self.params,
            running: self.running,
        }
    }
}
