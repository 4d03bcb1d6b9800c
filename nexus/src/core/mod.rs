//! Deterministic, pure logic shared by the goal engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod analysis_validator;
pub mod budget;
pub mod context;
pub mod decision;
pub mod event_log;
pub mod invariants;
pub mod params;
pub mod path;
pub mod rollup;
pub mod selector;
pub mod store;
pub mod types;
