//! Locating prebuilt engine and toolchain artifacts.
//!
//! Downloading artifacts is out of scope; targets only ask where an artifact
//! lives for a given mode and platform.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::mode::{BuildMode, TargetPlatform};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
  #[error("artifact '{artifact}' not found for {platform}-{mode} under {root}")]
  NotFound {
    artifact: String,
    mode: BuildMode,
    platform: TargetPlatform,
    root: PathBuf,
  },
}

/// Resolves artifact identifiers to filesystem paths.
pub trait ArtifactLocator: Debug + Send + Sync {
  fn artifact_path(&self, artifact: &str, mode: BuildMode, platform: TargetPlatform) -> Result<PathBuf, ArtifactError>;
}

/// Artifacts laid out in a local cache directory.
///
/// Looks for `<root>/<platform>-<mode>/<artifact>` first, then for the
/// mode-independent `<root>/<artifact>`.
#[derive(Debug, Clone)]
pub struct CachedArtifacts {
  root: PathBuf,
}

impl CachedArtifacts {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl ArtifactLocator for CachedArtifacts {
  fn artifact_path(&self, artifact: &str, mode: BuildMode, platform: TargetPlatform) -> Result<PathBuf, ArtifactError> {
    let specific = self.root.join(format!("{platform}-{mode}")).join(artifact);
    if specific.exists() {
      return Ok(specific);
    }
    let generic = self.root.join(artifact);
    if generic.exists() {
      return Ok(generic);
    }
    Err(ArtifactError::NotFound {
      artifact: artifact.to_string(),
      mode,
      platform,
      root: self.root.clone(),
    })
  }
}
