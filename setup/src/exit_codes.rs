//! Stable exit codes for the setup CLI.

/// Every executed step succeeded (skipped units do not count).
pub const OK: i32 = 0;
/// At least one executed step failed.
pub const FAILED: i32 = 1;
/// The tool could not start: invalid config or unresolvable project root.
pub const INVALID: i32 = 2;
