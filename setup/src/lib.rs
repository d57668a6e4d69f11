//! Development environment setup sequencer.
//!
//! Runs a fixed, ordered list of external commands for each sub-project
//! (unit) found under a project root, keeps going past individual failures,
//! and folds every executed step into one aggregate result.
//!
//! - **[`core`]**: Pure, deterministic logic (plan, outcomes, aggregate fold).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, manifest checks, process
//!   execution, console output). Isolated behind traits for tests.
//!
//! [`sequence`] coordinates the two to implement the `setup` command.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod sequence;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
