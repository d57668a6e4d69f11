//! Bind configured units to directories under the project root.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::plan::UnitSpec;
use crate::core::types::ProjectUnit;

/// True when `directory` exists and contains `manifest` as a regular file.
pub fn manifest_present(directory: &Path, manifest: &str) -> bool {
    directory.is_dir() && directory.join(manifest).is_file()
}

/// Resolve every configured unit against `project_root`, preserving declared order.
pub fn resolve_units(project_root: &Path, specs: &[UnitSpec], manifest: &str) -> Vec<ProjectUnit> {
    specs
        .iter()
        .map(|spec| {
            let present = manifest_present(&project_root.join(&spec.name), manifest);
            debug!(unit = %spec.name, manifest_present = present, "resolved unit");
            ProjectUnit::from_spec(project_root, spec, present)
        })
        .collect()
}

/// Project root for an executable installed at `<root>/<dir>/<exe>`.
///
/// Mirrors a setup script living in `<root>/scripts/`: the root is one level
/// above the directory that contains the executable.
pub fn project_root_for_executable(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(Path::to_path_buf)
}
