//! Goal-decomposition engine.
//!
//! A directive becomes the root of a goal forest. Each scheduler cycle picks
//! the most urgent pending goal, asks an analyzer whether it can be solved
//! directly, and either records the solution, spawns sub-goals, or forces a
//! best-effort completion at the depth limit.
//!
//! - **[`core`]**: Pure logic (store, selection, decisions, rollup,
//!   invariants). No I/O.
//! - **[`agents`]**: Analyzer and synthesizer gateways.
//! - **[`io`]**: Config, agent process execution, prompts, transcripts.
//!
//! [`session`], [`engine`] and [`controller`] tie these together: the engine
//! runs single-flight cycles over a session and the controller paces them.

pub mod agents;
pub mod controller;
pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
