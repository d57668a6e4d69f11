//! Setup configuration stored at `<root>/setup.toml`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::plan::{DEFAULT_MANIFEST, UnitSpec, default_next_steps, default_units};

pub const CONFIG_FILE_NAME: &str = "setup.toml";

/// Setup configuration (TOML).
///
/// Every field is optional in the file. A missing file yields the built-in
/// backend/frontend plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    /// File whose presence inside a unit directory enables that unit.
    pub manifest: String,

    /// Kill a step after this many seconds. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,

    /// Keep at most this many bytes of each step's stdout/stderr.
    pub output_limit_bytes: usize,

    /// Lines printed after a successful run.
    pub next_steps: Vec<String>,

    pub units: Vec<UnitSpec>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST.to_string(),
            step_timeout_secs: None,
            output_limit_bytes: 1_000_000,
            next_steps: default_next_steps(),
            units: default_units(),
        }
    }
}

impl SetupConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.manifest.trim().is_empty() {
            return Err(anyhow!("manifest must be non-empty"));
        }
        if self.step_timeout_secs == Some(0) {
            return Err(anyhow!("step_timeout_secs must be > 0 when set"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !is_single_component(&unit.name) {
                return Err(anyhow!(
                    "unit name {:?} must be a single directory name",
                    unit.name
                ));
            }
            if !seen.insert(unit.name.as_str()) {
                return Err(anyhow!("duplicate unit name {:?}", unit.name));
            }
            for step in &unit.steps {
                if step.program.trim().is_empty() {
                    return Err(anyhow!(
                        "unit {:?} step {:?} has an empty program",
                        unit.name,
                        step.label
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SetupConfig::default()`.
pub fn load_config(path: &Path) -> Result<SetupConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using built-in plan");
        let cfg = SetupConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SetupConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(path = %path.display(), units = cfg.units.len(), "loaded config");
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SetupConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::StepSpec;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, SetupConfig::default());
        assert_eq!(cfg.step_timeout(), None);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        let cfg = SetupConfig {
            step_timeout_secs: Some(90),
            ..SetupConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "step_timeout_secs = 600\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.step_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(cfg.units, default_units());
        assert_eq!(cfg.manifest, DEFAULT_MANIFEST);
    }

    #[test]
    fn units_table_replaces_plan() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        let toml = r#"
manifest = "Cargo.toml"

[[units]]
name = "api"

[[units.steps]]
label = "Building api"
program = "cargo"
args = ["build"]
"#;
        fs::write(&path, toml).expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.manifest, "Cargo.toml");
        assert_eq!(
            cfg.units,
            vec![UnitSpec {
                name: "api".to_string(),
                steps: vec![StepSpec::new("Building api", "cargo", &["build"])],
            }]
        );
    }

    #[test]
    fn rejects_misspelled_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "step_timeout = 60\n").expect("write");
        let message = format!("{:#}", load_config(&path).unwrap_err());
        assert!(message.contains("step_timeout"), "{message}");

        fs::write(
            &path,
            "[[units]]\nname = \"api\"\n\n[[units.steps]]\nlabel = \"Build\"\ncommand = \"cargo\"\n",
        )
        .expect("write");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = SetupConfig {
            step_timeout_secs: Some(0),
            ..SetupConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("step_timeout_secs"));
    }

    #[test]
    fn rejects_duplicate_and_nested_unit_names() {
        let mut cfg = SetupConfig::default();
        cfg.units[1].name = cfg.units[0].name.clone();
        assert!(cfg.validate().unwrap_err().to_string().contains("duplicate"));

        let mut cfg = SetupConfig::default();
        cfg.units[0].name = "../backend".to_string();
        assert!(
            cfg.validate()
                .unwrap_err()
                .to_string()
                .contains("single directory name")
        );
    }

    #[test]
    fn rejects_empty_program() {
        let mut cfg = SetupConfig::default();
        cfg.units[0].steps[1].program = "  ".to_string();
        assert!(cfg.validate().unwrap_err().to_string().contains("empty program"));
    }

    #[test]
    fn invalid_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "output_limit_bytes = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("invalid config"));
        assert!(message.contains("output_limit_bytes"));
    }
}
