//! Helpers shared by unit tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::environment::{BuildMode, Environment, TargetPlatform};
use crate::target::{ActionOutput, Target};

/// An environment rooted at `dir` with its build directory at `dir/build`.
pub fn test_env(dir: &Path) -> Environment {
  Environment::builder(dir)
    .mode(BuildMode::Debug)
    .platform(TargetPlatform::LinuxX64)
    .build_dir(dir.join("build"))
    .build()
    .unwrap()
}

/// Write a file relative to `dir`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, content: &str) {
  let path = dir.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// A target copying `from` to `to` (both project relative) that counts its runs.
pub fn copy_target(name: &str, from: &str, to: &str, runs: &Arc<AtomicUsize>) -> Target {
  let runs = Arc::clone(runs);
  let (from, to) = (from.to_string(), to.to_string());
  Target::new(name)
    .input(from.as_str())
    .output(to.as_str())
    .action(move |env| {
      runs.fetch_add(1, Ordering::SeqCst);
      fs::copy(env.project_dir().join(&from), env.project_dir().join(&to))?;
      Ok(ActionOutput::default())
    })
}
