//! Stable exit codes for `nexus` CLI commands.

/// Command succeeded; for `run`, every goal completed.
pub const OK: i32 = 0;
/// Invalid config or arguments, or another error before the run could finish.
pub const INVALID: i32 = 1;
/// `nexus run` stalled or hit its cycle limit with work left.
pub const INCOMPLETE: i32 = 2;
/// `nexus run` halted on a gateway failure.
pub const FAILED: i32 = 3;
