//! Implementation of the `kiln clean` command.

use std::fs;

use anyhow::{Context, Result};

use kiln_lib::consts::DEFAULT_BUILD_ROOT;

use super::ProjectArgs;
use crate::output::{print_info, print_success};

/// Remove the current build directory, or with `all` every derived build
/// directory of the project.
///
/// Declared outputs outside the build directory are left alone.
pub fn cmd_clean(project: &ProjectArgs, all: bool) -> Result<()> {
  let dir = if all {
    project.project_dir()?.join(DEFAULT_BUILD_ROOT)
  } else {
    project.environment()?.build_dir().to_path_buf()
  };

  if !dir.exists() {
    print_info(&format!("Nothing to clean at {}", dir.display()));
    return Ok(());
  }

  fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
  print_success(&format!("Removed {}", dir.display()));
  Ok(())
}
