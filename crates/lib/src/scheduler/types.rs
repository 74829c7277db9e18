//! Types for scheduling and executing a build.
//!
//! This module defines the error type, the per-target report and the
//! configuration of the scheduler.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::depfile::DepfileError;
use crate::environment::{BuildMode, TargetPlatform};
use crate::source::PatternError;
use crate::target::TargetError;
use crate::util::hash::HashError;

/// Ordered target names forming a dependency cycle.
///
/// For `A -> B -> C -> A` the path is `[A, B, C]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(pub Vec<String>);

impl fmt::Display for CyclePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names = self.0.iter();
    if let Some(first) = names.next() {
      write!(f, "{first}")?;
      for name in names {
        write!(f, " -> {name}")?;
      }
      write!(f, " -> {first}")?;
    }
    Ok(())
  }
}

/// Errors that abort a build.
///
/// Every variant is fatal: the remaining schedule is abandoned and the file
/// cache is not persisted.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Two targets share a name.
  #[error("duplicate target name: {0}")]
  DuplicateTarget(String),

  /// A requested or referenced target is not registered.
  #[error("unknown target '{name}'{}", required_by.as_ref().map(|by| format!(" (required by '{by}')")).unwrap_or_default())]
  UnknownTarget { name: String, required_by: Option<String> },

  /// The dependency graph contains a cycle.
  #[error("dependency cycle detected: {path}")]
  Cycle { path: CyclePath },

  /// The target cannot be built in this mode/platform combination.
  #[error("target '{target}' does not support {mode} builds for {platform}")]
  InvalidBuild {
    target: String,
    mode: BuildMode,
    platform: TargetPlatform,
  },

  /// A declared input or output could not be resolved.
  #[error("target '{target}' has an invalid source: {source}")]
  Pattern {
    target: String,
    #[source]
    source: PatternError,
  },

  /// A declared input does not exist.
  #[error("target '{target}' is missing input {}", path.display())]
  MissingInput { target: String, path: PathBuf },

  /// The action succeeded but did not produce a declared output.
  #[error("target '{target}' did not produce output {}", path.display())]
  MissingOutput { target: String, path: PathBuf },

  /// The action succeeded but neither returned nor wrote a declared depfile.
  #[error("target '{target}' did not produce depfile '{name}'")]
  MissingDepfile { target: String, name: String },

  /// The action returned a depfile the target never declared.
  #[error("target '{target}' returned undeclared depfile '{name}'")]
  UndeclaredDepfile { target: String, name: String },

  /// The action itself reported an error.
  #[error("target '{target}' failed: {source}")]
  ActionFailed {
    target: String,
    #[source]
    source: TargetError,
  },

  #[error("target '{target}': {source}")]
  Depfile {
    target: String,
    #[source]
    source: DepfileError,
  },

  /// Hashing a target's files failed.
  #[error("target '{target}': {source}")]
  Cache {
    target: String,
    #[source]
    source: CacheError,
  },

  /// Listing an input directory failed.
  #[error("target '{target}': {source}")]
  Listing {
    target: String,
    #[source]
    source: HashError,
  },

  #[error("target '{target}': failed to access {}: {source}", path.display())]
  Io {
    target: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Writing the file cache at the end of the build failed.
  #[error("failed to persist file cache: {0}")]
  Persist(#[source] CacheError),

  /// A worker task panicked or was cancelled.
  #[error("target '{target}' task did not complete: {message}")]
  Join { target: String, message: String },
}

impl BuildError {
  /// The target the error is about, if any.
  pub fn target(&self) -> Option<&str> {
    match self {
      BuildError::DuplicateTarget(name) => Some(name),
      BuildError::UnknownTarget { name, .. } => Some(name),
      BuildError::Cycle { path } => path.0.first().map(String::as_str),
      BuildError::InvalidBuild { target, .. }
      | BuildError::Pattern { target, .. }
      | BuildError::MissingInput { target, .. }
      | BuildError::MissingOutput { target, .. }
      | BuildError::MissingDepfile { target, .. }
      | BuildError::UndeclaredDepfile { target, .. }
      | BuildError::ActionFailed { target, .. }
      | BuildError::Depfile { target, .. }
      | BuildError::Cache { target, .. }
      | BuildError::Listing { target, .. }
      | BuildError::Io { target, .. }
      | BuildError::Join { target, .. } => Some(target),
      BuildError::Persist(_) => None,
    }
  }
}

/// Why a target was considered stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
  /// No stamp from a previous successful execution.
  FirstRun,
  /// Neither inputs nor outputs are declared, so the target always runs.
  NoDeclaredFiles,
  /// The resolved input or output set differs from the last execution.
  FilesChanged,
  InputChanged(PathBuf),
  OutputMissing(PathBuf),
  OutputChanged(PathBuf),
}

impl fmt::Display for StaleReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StaleReason::FirstRun => write!(f, "never built"),
      StaleReason::NoDeclaredFiles => write!(f, "no declared inputs or outputs"),
      StaleReason::FilesChanged => write!(f, "declared files changed"),
      StaleReason::InputChanged(path) => write!(f, "input changed: {}", path.display()),
      StaleReason::OutputMissing(path) => write!(f, "output missing: {}", path.display()),
      StaleReason::OutputChanged(path) => write!(f, "output modified: {}", path.display()),
    }
  }
}

/// Terminal state of a target within one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
  /// Up to date; the action was not invoked.
  Skipped,
  /// The action ran and its outputs were verified.
  Built(StaleReason),
}

/// Outcome of one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
  pub name: String,
  pub status: TargetStatus,
  pub elapsed: Duration,
}

impl TargetReport {
  pub fn was_built(&self) -> bool {
    matches!(self.status, TargetStatus::Built(_))
  }
}

/// Result of a successful build, in execution order.
#[derive(Debug, Default)]
pub struct BuildSummary {
  pub targets: Vec<TargetReport>,
  pub elapsed: Duration,
}

impl BuildSummary {
  pub fn report(&self, name: &str) -> Option<&TargetReport> {
    self.targets.iter().find(|r| r.name == name)
  }

  /// Whether the named target's action ran.
  pub fn was_built(&self, name: &str) -> bool {
    self.report(name).is_some_and(TargetReport::was_built)
  }

  /// Names of targets whose action ran, in execution order.
  pub fn built(&self) -> Vec<&str> {
    self
      .targets
      .iter()
      .filter(|r| r.was_built())
      .map(|r| r.name.as_str())
      .collect()
  }

  pub fn built_count(&self) -> usize {
    self.targets.iter().filter(|r| r.was_built()).count()
  }

  pub fn skipped_count(&self) -> usize {
    self.targets.len() - self.built_count()
  }
}

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  /// Maximum number of targets executing at once within a wave.
  ///
  /// `1` runs targets strictly one after another in topological order.
  pub parallelism: usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self { parallelism: 1 }
  }
}

impl SchedulerConfig {
  /// One worker per available CPU.
  pub fn parallel() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4),
    }
  }
}
