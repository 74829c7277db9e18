//! Immutable build configuration shared by every target.
//!
//! An [`Environment`] is created once per build invocation with
//! [`EnvironmentBuilder`] and handed to targets read-only.

pub mod artifacts;
pub mod mode;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::consts::DEFAULT_BUILD_ROOT;
use crate::util::hash::{HashError, Hashable};

pub use artifacts::{ArtifactError, ArtifactLocator, CachedArtifacts};
pub use mode::{BuildMode, TargetPlatform};

#[derive(Debug, Error)]
pub enum EnvironmentError {
  #[error("no target platform given and the host platform is not supported")]
  UnknownPlatform,

  #[error("failed to derive build directory: {0}")]
  BuildKey(#[from] HashError),
}

/// The inputs that distinguish one build configuration from another.
///
/// Serialized and hashed to name the default build directory so that builds
/// with different defines never share cache or stamp files.
#[derive(Serialize)]
struct BuildKey<'a> {
  mode: BuildMode,
  platform: TargetPlatform,
  defines: &'a BTreeMap<String, String>,
}

impl Hashable for BuildKey<'_> {}

/// Configuration of one build invocation.
#[derive(Debug, Clone)]
pub struct Environment {
  mode: BuildMode,
  platform: TargetPlatform,
  defines: BTreeMap<String, String>,
  root_dir: PathBuf,
  project_dir: PathBuf,
  output_dir: PathBuf,
  build_dir: PathBuf,
  artifacts: Arc<dyn ArtifactLocator>,
}

impl Environment {
  pub fn builder(project_dir: impl Into<PathBuf>) -> EnvironmentBuilder {
    EnvironmentBuilder::new(project_dir)
  }

  pub fn mode(&self) -> BuildMode {
    self.mode
  }

  pub fn platform(&self) -> TargetPlatform {
    self.platform
  }

  pub fn defines(&self) -> &BTreeMap<String, String> {
    &self.defines
  }

  pub fn define(&self, key: &str) -> Option<&str> {
    self.defines.get(key).map(String::as_str)
  }

  /// Root of the toolchain installation.
  pub fn root_dir(&self) -> &Path {
    &self.root_dir
  }

  pub fn project_dir(&self) -> &Path {
    &self.project_dir
  }

  /// Where final artifacts are copied for consumption by packaging tools.
  pub fn output_dir(&self) -> &Path {
    &self.output_dir
  }

  /// Where intermediate files, depfiles, stamps and the file cache live.
  pub fn build_dir(&self) -> &Path {
    &self.build_dir
  }

  /// Resolve an artifact for this environment's mode and platform.
  pub fn artifact_path(&self, artifact: &str) -> Result<PathBuf, ArtifactError> {
    self.artifacts.artifact_path(artifact, self.mode, self.platform)
  }

  /// Variables exported to external commands run on behalf of a target.
  pub fn command_vars(&self) -> Vec<(String, String)> {
    let mut vars = vec![
      ("PROJECT_DIR".to_string(), self.project_dir.display().to_string()),
      ("BUILD_DIR".to_string(), self.build_dir.display().to_string()),
      ("OUTPUT_DIR".to_string(), self.output_dir.display().to_string()),
      ("ROOT_DIR".to_string(), self.root_dir.display().to_string()),
      ("BUILD_MODE".to_string(), self.mode.to_string()),
      ("TARGET_PLATFORM".to_string(), self.platform.to_string()),
    ];
    for (key, value) in &self.defines {
      vars.push((format!("KILN_DEFINE_{}", key.to_uppercase()), value.clone()));
    }
    vars
  }
}

/// Builder for [`Environment`].
///
/// Only the project directory is required. Defaults:
/// - mode: debug
/// - platform: the host platform
/// - root dir: the project directory
/// - output dir: `<project>/build`
/// - build dir: `<project>/.kiln/build/<key>` where key hashes mode, platform and defines
/// - artifacts: [`CachedArtifacts`] under `<root>/bin/cache/artifacts`
#[derive(Debug)]
pub struct EnvironmentBuilder {
  project_dir: PathBuf,
  mode: BuildMode,
  platform: Option<TargetPlatform>,
  defines: BTreeMap<String, String>,
  root_dir: Option<PathBuf>,
  output_dir: Option<PathBuf>,
  build_dir: Option<PathBuf>,
  artifacts: Option<Arc<dyn ArtifactLocator>>,
}

impl EnvironmentBuilder {
  pub fn new(project_dir: impl Into<PathBuf>) -> Self {
    Self {
      project_dir: project_dir.into(),
      mode: BuildMode::Debug,
      platform: None,
      defines: BTreeMap::new(),
      root_dir: None,
      output_dir: None,
      build_dir: None,
      artifacts: None,
    }
  }

  pub fn mode(mut self, mode: BuildMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn platform(mut self, platform: TargetPlatform) -> Self {
    self.platform = Some(platform);
    self
  }

  pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.defines.insert(key.into(), value.into());
    self
  }

  pub fn defines(mut self, defines: impl IntoIterator<Item = (String, String)>) -> Self {
    self.defines.extend(defines);
    self
  }

  pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.root_dir = Some(dir.into());
    self
  }

  pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.output_dir = Some(dir.into());
    self
  }

  pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.build_dir = Some(dir.into());
    self
  }

  pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactLocator>) -> Self {
    self.artifacts = Some(artifacts);
    self
  }

  pub fn build(self) -> Result<Environment, EnvironmentError> {
    let platform = match self.platform {
      Some(platform) => platform,
      None => TargetPlatform::host().ok_or(EnvironmentError::UnknownPlatform)?,
    };

    let build_dir = match self.build_dir {
      Some(dir) => dir,
      None => {
        let key = BuildKey {
          mode: self.mode,
          platform,
          defines: &self.defines,
        }
        .compute_key()?;
        self.project_dir.join(DEFAULT_BUILD_ROOT).join(key)
      }
    };

    let root_dir = self.root_dir.unwrap_or_else(|| self.project_dir.clone());
    let output_dir = self.output_dir.unwrap_or_else(|| self.project_dir.join("build"));
    let artifacts = self.artifacts.unwrap_or_else(|| {
      Arc::new(CachedArtifacts::new(root_dir.join("bin").join("cache").join("artifacts")))
    });

    Ok(Environment {
      mode: self.mode,
      platform,
      defines: self.defines,
      root_dir,
      project_dir: self.project_dir,
      output_dir,
      build_dir,
      artifacts,
    })
  }
}
