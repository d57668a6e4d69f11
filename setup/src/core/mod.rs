//! Deterministic, pure logic for the setup sequencer.
//!
//! Core modules must be free of I/O side effects. They describe units, steps
//! and outcomes and fold outcomes into the run aggregate.

pub mod plan;
pub mod types;
