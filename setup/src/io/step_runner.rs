//! Step execution backend.
//!
//! The [`StepRunner`] trait decouples sequencing from process spawning. Tests
//! use scripted runners that return predetermined outcomes without spawning
//! processes.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::types::{CommandStep, StepFailure, StepOutcome};
use crate::io::process::{CommandOutput, run_command};

/// Executes one step. Never fails: every problem becomes a failed outcome.
pub trait StepRunner {
    fn run(&self, step: &CommandStep) -> StepOutcome;
}

/// Runs steps as real child processes.
#[derive(Debug, Clone)]
pub struct ProcessStepRunner {
    pub timeout: Option<Duration>,
    pub output_limit_bytes: usize,
}

impl StepRunner for ProcessStepRunner {
    #[instrument(skip_all, fields(command = %step.command_line(), workdir = %step.working_directory.display()))]
    fn run(&self, step: &CommandStep) -> StepOutcome {
        info!("running step");
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args).current_dir(&step.working_directory);

        match run_command(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => classify_output(&output, self.timeout),
            Err(err) => {
                let error = format!("{err:#}");
                warn!(err = %error, "step could not be run");
                StepOutcome::Failed(StepFailure::Launch { error })
            }
        }
    }
}

fn classify_output(output: &CommandOutput, timeout: Option<Duration>) -> StepOutcome {
    if output.timed_out {
        let timeout = timeout.unwrap_or_default();
        warn!(timeout_secs = timeout.as_secs(), "step timed out");
        return StepOutcome::Failed(StepFailure::TimedOut {
            timeout,
            stderr: output.stderr_lossy(),
        });
    }
    if output.status.success() {
        debug!("step succeeded");
        return StepOutcome::Succeeded;
    }
    warn!(exit_code = ?output.status.code(), "step failed");
    StepOutcome::Failed(StepFailure::NonZeroExit {
        code: output.status.code(),
        stderr: output.stderr_lossy(),
    })
}
