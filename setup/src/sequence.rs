//! Setup sequencing: run every present unit's steps in declared order.
//!
//! Failures never short-circuit. Each executed step contributes one record,
//! skipped units contribute none, and the records fold into a [`RunResult`].

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::core::types::{ProjectUnit, RunResult, StepRecord, UnitResult, UnitStatus};
use crate::io::config::SetupConfig;
use crate::io::reporter::Reporter;
use crate::io::step_runner::StepRunner;
use crate::io::units::resolve_units;

/// Resolve the configured units under `project_root` and run them.
#[instrument(skip_all, fields(project_root = %project_root.display()))]
pub fn run<S: StepRunner, R: Reporter>(
    project_root: &Path,
    config: &SetupConfig,
    runner: &S,
    reporter: &mut R,
) -> RunResult {
    reporter.run_started(project_root);
    let units = resolve_units(project_root, &config.units, &config.manifest);
    let result = run_units(&units, &config.manifest, runner, reporter);
    reporter.run_finished(&result, &config.next_steps);
    info!(
        overall_success = result.overall_success(),
        executed = result.executed_steps(),
        failed = result.failed_steps(),
        "setup finished"
    );
    result
}

/// Run already-resolved units strictly in order.
pub fn run_units<S: StepRunner, R: Reporter>(
    units: &[ProjectUnit],
    manifest: &str,
    runner: &S,
    reporter: &mut R,
) -> RunResult {
    let results = units
        .iter()
        .map(|unit| run_unit(unit, manifest, runner, reporter))
        .collect();
    RunResult::from_units(results)
}

fn run_unit<S: StepRunner, R: Reporter>(
    unit: &ProjectUnit,
    manifest: &str,
    runner: &S,
    reporter: &mut R,
) -> UnitResult {
    if !unit.manifest_present {
        warn!(unit = %unit.name, directory = %unit.directory.display(), "unit skipped");
        reporter.unit_skipped(unit, manifest);
        return UnitResult {
            name: unit.name.clone(),
            status: UnitStatus::Skipped,
        };
    }

    let records = unit
        .steps
        .iter()
        .map(|step| {
            reporter.step_started(step);
            let outcome = runner.run(step);
            reporter.step_finished(step, &outcome);
            StepRecord {
                command_line: step.command_line(),
                outcome,
            }
        })
        .collect();

    UnitResult {
        name: unit.name.clone(),
        status: UnitStatus::Ran(records),
    }
}
