//! Data model for a setup run.
//!
//! Units and steps are built once at startup and never mutated. Outcomes are
//! immutable values folded into a [`RunResult`] at the end of the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::plan::{StepSpec, UnitSpec};

/// A sub-project bound to a concrete directory under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectUnit {
    pub name: String,
    pub directory: PathBuf,
    /// Directory and manifest both exist; only then do steps run.
    pub manifest_present: bool,
    pub steps: Vec<CommandStep>,
}

impl ProjectUnit {
    /// Bind `spec` to `project_root / spec.name`.
    pub fn from_spec(project_root: &Path, spec: &UnitSpec, manifest_present: bool) -> Self {
        let directory = project_root.join(&spec.name);
        let steps = spec
            .steps
            .iter()
            .map(|step| CommandStep::from_spec(step, &directory))
            .collect();
        Self {
            name: spec.name.clone(),
            directory,
            manifest_present,
            steps,
        }
    }
}

/// One external command, run as an argument vector (no shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
}

impl CommandStep {
    pub fn from_spec(spec: &StepSpec, working_directory: &Path) -> Self {
        Self {
            label: spec.label.clone(),
            program: spec.program.clone(),
            args: spec.args.clone(),
            working_directory: working_directory.to_path_buf(),
        }
    }

    /// Display form: `program arg1 arg2`. Never handed to a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Why a step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The process could not be started at all.
    Launch { error: String },
    /// The process ran and exited non-zero (or was killed by a signal, `code == None`).
    NonZeroExit { code: Option<i32>, stderr: String },
    /// The process exceeded the configured step timeout and was killed.
    TimedOut { timeout: Duration, stderr: String },
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::Launch { error } => write!(f, "failed to launch: {error}"),
            StepFailure::NonZeroExit {
                code: Some(code), ..
            } => write!(f, "exited with status {code}"),
            StepFailure::NonZeroExit { code: None, .. } => write!(f, "terminated by signal"),
            StepFailure::TimedOut { timeout, .. } => {
                write!(f, "timed out after {}s", timeout.as_secs())
            }
        }
    }
}

/// Result of executing one [`CommandStep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }

    /// Captured stderr, present only on failure.
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            StepOutcome::Succeeded => None,
            StepOutcome::Failed(StepFailure::Launch { .. }) => None,
            StepOutcome::Failed(StepFailure::NonZeroExit { stderr, .. })
            | StepOutcome::Failed(StepFailure::TimedOut { stderr, .. }) => Some(stderr),
        }
    }
}

/// An executed step paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub command_line: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Directory or manifest missing; nothing ran.
    Skipped,
    /// Steps ran in declared order, one record per step.
    Ran(Vec<StepRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    pub name: String,
    pub status: UnitStatus,
}

impl UnitResult {
    pub fn records(&self) -> &[StepRecord] {
        match &self.status {
            UnitStatus::Skipped => &[],
            UnitStatus::Ran(records) => records,
        }
    }
}

/// Aggregate over every executed step of a run.
///
/// `overall_success` is false iff at least one executed step failed. Skipped
/// units contribute no records and therefore never fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    overall_success: bool,
    units: Vec<UnitResult>,
}

impl RunResult {
    pub fn from_units(units: Vec<UnitResult>) -> Self {
        let overall_success = units
            .iter()
            .flat_map(UnitResult::records)
            .fold(true, |acc, record| acc && record.outcome.succeeded());
        Self {
            overall_success,
            units,
        }
    }

    pub fn overall_success(&self) -> bool {
        self.overall_success
    }

    pub fn units(&self) -> &[UnitResult] {
        &self.units
    }

    pub fn executed_steps(&self) -> usize {
        self.units.iter().map(|unit| unit.records().len()).sum()
    }

    pub fn failed_steps(&self) -> usize {
        self.units
            .iter()
            .flat_map(UnitResult::records)
            .filter(|record| !record.outcome.succeeded())
            .count()
    }
}
