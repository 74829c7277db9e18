//! Build targets.
//!
//! A [`Target`] is a plain record: declared inputs, outputs, dependency names,
//! depfile names and one function-valued action. Behavior is composed by
//! wrapping the action (see [`Target::with_post_action`]) rather than by
//! subtyping. Targets are registered in a [`TargetSet`] and refer to their
//! dependencies by name.

mod set;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::consts::STAMP_EXTENSION;
use crate::depfile::{Depfile, DepfileError};
use crate::environment::{ArtifactError, BuildMode, Environment, TargetPlatform};
use crate::source::{PatternError, Source};

pub use set::TargetSet;

/// Errors reported by a target's action.
#[derive(Debug, Error)]
pub enum TargetError {
  /// An external command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// An external command could not be started.
  #[error("failed to spawn '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error(transparent)]
  Pattern(#[from] PatternError),

  #[error(transparent)]
  Depfile(#[from] DepfileError),

  /// Free-form failure reported by the action itself.
  #[error("{0}")]
  Failed(String),
}

/// What an action hands back to the scheduler besides its files on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
  /// Depfiles keyed by the names the target declared.
  pub depfiles: BTreeMap<String, Depfile>,
}

impl ActionOutput {
  pub fn with_depfile(mut self, name: impl Into<String>, depfile: Depfile) -> Self {
    self.depfiles.insert(name.into(), depfile);
    self
  }
}

pub type ActionResult = Result<ActionOutput, TargetError>;

/// The side-effecting part of a target.
pub type Action = Arc<dyn Fn(&Environment) -> ActionResult + Send + Sync>;

/// A named unit of build work.
#[derive(Clone)]
pub struct Target {
  name: String,
  inputs: Vec<Source>,
  outputs: Vec<Source>,
  dependencies: Vec<String>,
  depfiles: Vec<String>,
  modes: Option<Vec<BuildMode>>,
  platforms: Option<Vec<TargetPlatform>>,
  action: Action,
}

impl fmt::Debug for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Target")
      .field("name", &self.name)
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .field("dependencies", &self.dependencies)
      .field("depfiles", &self.depfiles)
      .field("modes", &self.modes)
      .field("platforms", &self.platforms)
      .finish_non_exhaustive()
  }
}

impl Target {
  /// A target that does nothing until an action is attached.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      inputs: Vec::new(),
      outputs: Vec::new(),
      dependencies: Vec::new(),
      depfiles: Vec::new(),
      modes: None,
      platforms: None,
      action: Arc::new(|_: &Environment| Ok(ActionOutput::default())),
    }
  }

  pub fn input(mut self, source: impl Into<Source>) -> Self {
    self.inputs.push(source.into());
    self
  }

  pub fn output(mut self, source: impl Into<Source>) -> Self {
    self.outputs.push(source.into());
    self
  }

  pub fn depends_on(mut self, name: impl Into<String>) -> Self {
    self.dependencies.push(name.into());
    self
  }

  /// Declare a depfile written to `<build dir>/<name>` whenever the action runs.
  pub fn depfile(mut self, name: impl Into<String>) -> Self {
    self.depfiles.push(name.into());
    self
  }

  /// Restrict the build modes this target can be built in.
  pub fn modes(mut self, modes: impl IntoIterator<Item = BuildMode>) -> Self {
    self.modes = Some(modes.into_iter().collect());
    self
  }

  /// Restrict the platforms this target can be built for.
  pub fn platforms(mut self, platforms: impl IntoIterator<Item = TargetPlatform>) -> Self {
    self.platforms = Some(platforms.into_iter().collect());
    self
  }

  pub fn action<F>(mut self, action: F) -> Self
  where
    F: Fn(&Environment) -> ActionResult + Send + Sync + 'static,
  {
    self.action = Arc::new(action);
    self
  }

  /// Wrap the current action so `post` runs on its successful result.
  pub fn with_post_action<F>(mut self, post: F) -> Self
  where
    F: Fn(&Environment, ActionOutput) -> ActionResult + Send + Sync + 'static,
  {
    let inner = Arc::clone(&self.action);
    self.action = Arc::new(move |env: &Environment| -> ActionResult { post(env, inner(env)?) });
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn declared_inputs(&self) -> &[Source] {
    &self.inputs
  }

  pub fn declared_outputs(&self) -> &[Source] {
    &self.outputs
  }

  pub fn dependencies(&self) -> &[String] {
    &self.dependencies
  }

  pub fn depfiles(&self) -> &[String] {
    &self.depfiles
  }

  /// No declared inputs and no declared outputs.
  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty() && self.outputs.is_empty()
  }

  /// Declared inputs resolved to concrete paths, in declaration order.
  pub fn inputs(&self, env: &Environment) -> Result<Vec<PathBuf>, PatternError> {
    self.inputs.iter().map(|source| source.resolve(env)).collect()
  }

  /// Declared outputs resolved to concrete paths, in declaration order.
  pub fn outputs(&self, env: &Environment) -> Result<Vec<PathBuf>, PatternError> {
    self.outputs.iter().map(|source| source.resolve(env)).collect()
  }

  pub fn depfile_paths(&self, env: &Environment) -> Vec<PathBuf> {
    self.depfiles.iter().map(|name| env.build_dir().join(name)).collect()
  }

  pub fn stamp_path(&self, env: &Environment) -> PathBuf {
    env.build_dir().join(format!("{}.{}", self.name, STAMP_EXTENSION))
  }

  /// Whether this target can be built in the environment's mode and platform.
  pub fn supports(&self, env: &Environment) -> bool {
    let mode_ok = self.modes.as_ref().is_none_or(|modes| modes.contains(&env.mode()));
    let platform_ok = self
      .platforms
      .as_ref()
      .is_none_or(|platforms| platforms.contains(&env.platform()));
    mode_ok && platform_ok
  }

  /// Run the action. Input and output checks are the scheduler's job.
  pub fn build(&self, env: &Environment) -> ActionResult {
    (self.action)(env)
  }
}
