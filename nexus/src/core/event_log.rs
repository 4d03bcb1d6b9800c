//! Append-only audit trail of scheduler decisions.
//!
//! This is product output shown to the operator. Developer diagnostics go
//! through `tracing` (see [`crate::logging`]); each appended entry is also
//! mirrored there at a level matching its kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    Info,
    Error,
    Thought,
    Action,
    Reasoning,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Error => "ERROR",
            LogKind::Thought => "THOUGHT",
            LogKind::Action => "ACTION",
            LogKind::Reasoning => "REASONING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Time-ordered log. Entries are never edited or removed individually.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        kind: LogKind,
        message: impl Into<String>,
        details: Option<String>,
    ) -> LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            details,
        };
        match kind {
            LogKind::Error => warn!(kind = kind.as_str(), message = %entry.message, "log entry"),
            LogKind::Info | LogKind::Action => {
                info!(kind = kind.as_str(), message = %entry.message, "log entry");
            }
            LogKind::Thought | LogKind::Reasoning => {
                debug!(kind = kind.as_str(), message = %entry.message, "log entry");
            }
        }
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn of_kind(&self, kind: LogKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// Drop every entry. Only a new directive does this.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
