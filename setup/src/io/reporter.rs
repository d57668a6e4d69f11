//! Console progress output.
//!
//! Progress lines are product output and go to stdout regardless of
//! `RUST_LOG`. Diagnostics stay in `tracing`.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::core::types::{CommandStep, ProjectUnit, RunResult, StepFailure, StepOutcome};

/// Receives sequencing events in execution order.
pub trait Reporter {
    fn run_started(&mut self, project_root: &Path);
    fn unit_skipped(&mut self, unit: &ProjectUnit, manifest: &str);
    fn step_started(&mut self, step: &CommandStep);
    fn step_finished(&mut self, step: &CommandStep, outcome: &StepOutcome);
    fn run_finished(&mut self, result: &RunResult, next_steps: &[String]);
}

/// Human-readable reporter over any writer (stdout in the binary).
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(err = %err, "failed to write progress line");
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self, project_root: &Path) {
        self.line(&format!(
            "🚀 Setting up development environment in {}...",
            project_root.display()
        ));
    }

    fn unit_skipped(&mut self, unit: &ProjectUnit, manifest: &str) {
        self.line(&format!(
            "\n⚠️  {}: directory not found or missing {manifest}",
            unit.name
        ));
    }

    fn step_started(&mut self, step: &CommandStep) {
        self.line(&format!("\n{}...", step.label));
        self.line(&format!("Running: {}", step.command_line()));
    }

    fn step_finished(&mut self, step: &CommandStep, outcome: &StepOutcome) {
        let command = step.command_line();
        match outcome {
            StepOutcome::Succeeded => self.line(&format!("✅ {command}")),
            StepOutcome::Failed(failure @ StepFailure::Launch { .. }) => {
                self.line(&format!("❌ {command} - {failure}"));
            }
            StepOutcome::Failed(failure) => {
                self.line(&format!("❌ {command} ({failure})"));
                let stderr = outcome.captured_stderr().unwrap_or_default().trim_end();
                self.line(&format!("Error: {stderr}"));
            }
        }
    }

    fn run_finished(&mut self, result: &RunResult, next_steps: &[String]) {
        if result.overall_success() {
            self.line("\n🎉 Setup completed successfully!");
            if !next_steps.is_empty() {
                self.line("\n📖 Next steps:");
                for (idx, step) in next_steps.iter().enumerate() {
                    self.line(&format!("{}. {step}", idx + 1));
                }
            }
        } else {
            self.line(&format!(
                "\n❌ Setup encountered some errors ({} of {} steps failed)",
                result.failed_steps(),
                result.executed_steps()
            ));
            for unit in result.units() {
                for record in unit.records() {
                    if let StepOutcome::Failed(failure) = &record.outcome {
                        self.line(&format!(
                            "  - {}: {} ({failure})",
                            unit.name, record.command_line
                        ));
                    }
                }
            }
        }
    }
}
