//! I/O helpers: configuration, agent processes, prompts and transcripts.

pub mod config;
pub mod executor;
pub mod process;
pub mod prompt;
pub mod schema;
pub mod transcript;
