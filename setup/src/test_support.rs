//! Test-only helpers: temp project layouts, scripted step runners, and a
//! recording reporter.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::plan::DEFAULT_MANIFEST;
use crate::core::types::{CommandStep, ProjectUnit, RunResult, StepFailure, StepOutcome};
use crate::io::reporter::Reporter;
use crate::io::step_runner::StepRunner;

/// Temporary project root with one directory per unit.
pub struct ProjectFixture {
    temp: TempDir,
}

impl ProjectFixture {
    /// Create `<tmp>/<unit>/package.json` for each named unit.
    pub fn with_units(units: &[&str]) -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let fixture = Self { temp };
        for unit in units {
            fixture.add_unit(unit)?;
        }
        Ok(fixture)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn add_unit(&self, name: &str) -> Result<()> {
        let dir = self.path().join(name);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let manifest = dir.join(DEFAULT_MANIFEST);
        fs::write(&manifest, "{}\n").with_context(|| format!("write {}", manifest.display()))?;
        Ok(())
    }

    /// Write `setup.toml` at the project root.
    pub fn write_config(&self, contents: &str) -> Result<()> {
        let path = self.path().join(crate::io::config::CONFIG_FILE_NAME);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }
}

pub fn ok() -> StepOutcome {
    StepOutcome::Succeeded
}

pub fn fail(code: i32, stderr: &str) -> StepOutcome {
    StepOutcome::Failed(StepFailure::NonZeroExit {
        code: Some(code),
        stderr: stderr.to_string(),
    })
}

/// Returns queued outcomes in order and records `(unit dir name, command line)`.
pub struct ScriptedStepRunner {
    outcomes: RefCell<VecDeque<StepOutcome>>,
    invocations: RefCell<Vec<(String, String)>>,
}

impl ScriptedStepRunner {
    pub fn new(outcomes: Vec<StepOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.borrow().clone()
    }
}

impl StepRunner for ScriptedStepRunner {
    fn run(&self, step: &CommandStep) -> StepOutcome {
        let unit = step
            .working_directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.invocations
            .borrow_mut()
            .push((unit, step.command_line()));
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                StepOutcome::Failed(StepFailure::Launch {
                    error: "scripted runner exhausted".to_string(),
                })
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Started,
    Skipped(String),
    StepStarted(String),
    StepFinished(String, bool),
    Finished { success: bool },
}

/// Captures reporter calls as [`ReportEvent`]s.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<ReportEvent>,
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self, _project_root: &Path) {
        self.events.push(ReportEvent::Started);
    }

    fn unit_skipped(&mut self, unit: &ProjectUnit, _manifest: &str) {
        self.events.push(ReportEvent::Skipped(unit.name.clone()));
    }

    fn step_started(&mut self, step: &CommandStep) {
        self.events
            .push(ReportEvent::StepStarted(step.command_line()));
    }

    fn step_finished(&mut self, step: &CommandStep, outcome: &StepOutcome) {
        self.events.push(ReportEvent::StepFinished(
            step.command_line(),
            outcome.succeeded(),
        ));
    }

    fn run_finished(&mut self, result: &RunResult, _next_steps: &[String]) {
        self.events.push(ReportEvent::Finished {
            success: result.overall_success(),
        });
    }
}
