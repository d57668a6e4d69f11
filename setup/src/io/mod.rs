//! I/O helpers for the setup sequencer.

pub mod config;
pub mod process;
pub mod reporter;
pub mod step_runner;
pub mod units;
