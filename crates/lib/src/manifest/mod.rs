//! JSON build manifests.
//!
//! A manifest declares targets whose actions are shell commands. Loading
//! validates every path pattern up front so malformed declarations are
//! reported before a build starts.

mod types;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::command::shell_action;
use crate::environment::Environment;
use crate::scheduler::BuildError;
use crate::source::{self, PatternError, Source};
use crate::target::{Target, TargetSet};

pub use types::{Manifest, TargetDef};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("target '{target}' has an invalid pattern: {source}")]
  Pattern {
    target: String,
    #[source]
    source: PatternError,
  },

  #[error(transparent)]
  Target(#[from] BuildError),
}

impl Manifest {
  /// Read and parse a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest: Manifest = serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), targets = manifest.targets.len(), "loaded manifest");
    Ok(manifest)
  }

  /// Turn the declarations into a [`TargetSet`].
  ///
  /// # Errors
  ///
  /// `Pattern` for malformed input or output patterns, and `Target` for
  /// duplicate names.
  pub fn into_targets(self) -> Result<TargetSet, ManifestError> {
    let mut set = TargetSet::new();
    for def in self.targets {
      set.insert(def.into_target()?)?;
    }
    Ok(set)
  }
}

impl TargetDef {
  fn into_target(self) -> Result<Target, ManifestError> {
    for pattern in self.inputs.iter().chain(&self.outputs) {
      source::parse(pattern).map_err(|source| ManifestError::Pattern {
        target: self.name.clone(),
        source,
      })?;
    }

    let mut target = Target::new(self.name);
    for input in self.inputs {
      target = target.input(Source::pattern(input));
    }
    for artifact in self.artifacts {
      target = target.input(Source::artifact(artifact));
    }
    for output in self.outputs {
      target = target.output(Source::pattern(output));
    }
    for dependency in self.dependencies {
      target = target.depends_on(dependency);
    }
    for depfile in self.depfiles {
      target = target.depfile(depfile);
    }
    if let Some(modes) = self.modes {
      target = target.modes(modes);
    }
    if let Some(platforms) = self.platforms {
      target = target.platforms(platforms);
    }
    if let Some(command) = self.command {
      let action = shell_action(command);
      target = target.action(move |env: &Environment| action(env));
    }
    Ok(target)
  }
}
