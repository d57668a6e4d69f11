//! Declarative unit and step list.
//!
//! The built-in plan is the backend/frontend pair. Order here is execution
//! order; nothing is derived from filesystem enumeration.

use serde::{Deserialize, Serialize};

pub const BACKEND: &str = "backend";
pub const FRONTEND: &str = "frontend";
pub const DEFAULT_MANIFEST: &str = "package.json";

/// One command of a unit, as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    /// Progress header printed before the command runs.
    pub label: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl StepSpec {
    pub fn new(label: &str, program: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }
}

/// A sub-project directory name plus its ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// Backend: install, test, build. Frontend: install, build.
pub fn default_units() -> Vec<UnitSpec> {
    vec![
        UnitSpec {
            name: BACKEND.to_string(),
            steps: vec![
                StepSpec::new("Installing backend dependencies", "npm", &["install"]),
                StepSpec::new("Running backend tests", "npm", &["test", "--", "--run"]),
                StepSpec::new("Building backend", "npm", &["run", "build"]),
            ],
        },
        UnitSpec {
            name: FRONTEND.to_string(),
            steps: vec![
                StepSpec::new("Installing frontend dependencies", "npm", &["install"]),
                StepSpec::new("Building frontend", "npm", &["run", "build"]),
            ],
        },
    ]
}

/// Guidance printed after a successful run.
pub fn default_next_steps() -> Vec<String> {
    vec![
        "Backend: cd backend && npm run dev".to_string(),
        "Frontend: cd frontend && npm run dev".to_string(),
        "Configure .env files for optional integrations".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(step: &StepSpec) -> Vec<&str> {
        step.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn backend_runs_before_frontend() {
        let names: Vec<String> = default_units().into_iter().map(|unit| unit.name).collect();
        assert_eq!(names, vec![BACKEND, FRONTEND]);
    }

    #[test]
    fn backend_installs_then_tests_then_builds() {
        let units = default_units();
        let backend = &units[0];
        assert_eq!(backend.steps.len(), 3);
        assert_eq!(args(&backend.steps[0]), vec!["install"]);
        assert_eq!(args(&backend.steps[1]), vec!["test", "--", "--run"]);
        assert_eq!(args(&backend.steps[2]), vec!["run", "build"]);
        assert!(backend.steps.iter().all(|step| step.program == "npm"));
    }

    #[test]
    fn frontend_has_exactly_two_steps() {
        let units = default_units();
        let frontend = &units[1];
        assert_eq!(frontend.steps.len(), 2);
        assert_eq!(args(&frontend.steps[0]), vec!["install"]);
        assert_eq!(args(&frontend.steps[1]), vec!["run", "build"]);
    }
}
