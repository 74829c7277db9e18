//! Shared helpers for library integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_lib::{
  ActionOutput, BuildError, BuildMode, BuildSummary, Environment, FileHasher, Scheduler, SchedulerConfig, Target,
  TargetPlatform, TargetSet,
};
use tempfile::TempDir;

/// A throwaway project directory with its build directory at `build/`.
pub struct Project {
  pub temp: TempDir,
  pub env: Arc<Environment>,
}

impl Project {
  pub fn new() -> Self {
    Self::with_mode(BuildMode::Debug)
  }

  pub fn with_mode(mode: BuildMode) -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    let env = Environment::builder(&root)
      .mode(mode)
      .platform(TargetPlatform::LinuxX64)
      .build_dir(root.join("build"))
      .build()
      .unwrap();
    Self {
      temp,
      env: Arc::new(env),
    }
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.env.project_dir().join(relative)
  }

  pub fn build_path(&self, relative: &str) -> PathBuf {
    self.env.build_dir().join(relative)
  }

  pub fn write(&self, relative: &str, content: &str) {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
  }

  pub fn read(&self, relative: &str) -> String {
    fs::read_to_string(self.path(relative)).unwrap()
  }

  pub fn remove(&self, relative: &str) {
    fs::remove_file(self.path(relative)).unwrap();
  }

  /// A hasher over this project's build directory, initialized from disk.
  pub fn hasher(&self) -> FileHasher {
    let hasher = FileHasher::new(self.env.build_dir());
    hasher.initialize();
    hasher
  }

  /// One build invocation with a freshly loaded file cache.
  pub async fn build(&self, targets: &TargetSet, root: &str) -> Result<BuildSummary, BuildError> {
    self.build_with(targets, root, SchedulerConfig::default()).await
  }

  pub async fn build_with(
    &self,
    targets: &TargetSet,
    root: &str,
    config: SchedulerConfig,
  ) -> Result<BuildSummary, BuildError> {
    Scheduler::new(Arc::new(self.hasher()), config)
      .build(targets, root, Arc::clone(&self.env))
      .await
  }
}

pub fn counter() -> Arc<AtomicUsize> {
  Arc::new(AtomicUsize::new(0))
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
  counter.load(Ordering::SeqCst)
}

/// Copies `from` to `to` (project relative) and counts its runs.
pub fn copy_target(name: &str, from: &str, to: &str, runs: &Arc<AtomicUsize>) -> Target {
  let runs = Arc::clone(runs);
  let (src, dst) = (from.to_string(), to.to_string());
  Target::new(name).input(from).output(to).action(move |env| {
    runs.fetch_add(1, Ordering::SeqCst);
    fs::copy(env.project_dir().join(&src), env.project_dir().join(&dst))?;
    Ok(ActionOutput::default())
  })
}

/// A target with no declared files that only counts its runs.
pub fn counting_target(name: &str, runs: &Arc<AtomicUsize>) -> Target {
  let runs = Arc::clone(runs);
  Target::new(name).action(move |_| {
    runs.fetch_add(1, Ordering::SeqCst);
    Ok(ActionOutput::default())
  })
}

pub fn targets(targets: impl IntoIterator<Item = Target>) -> TargetSet {
  TargetSet::from_targets(targets).unwrap()
}
