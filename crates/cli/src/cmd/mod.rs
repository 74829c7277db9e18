//! Subcommands and the project options they share.

mod build;
mod clean;
mod targets;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use kiln_lib::consts::DEFAULT_MANIFEST_NAME;
use kiln_lib::{BuildMode, Environment, Manifest, TargetPlatform, TargetSet};

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use targets::cmd_targets;

/// Where the project lives and how it is configured.
#[derive(Args, Debug)]
pub struct ProjectArgs {
  /// Build manifest [default: <project dir>/kiln.json]
  #[arg(short, long, global = true, env = "KILN_MANIFEST")]
  pub manifest: Option<PathBuf>,

  /// Project directory that relative source paths resolve against
  #[arg(long, global = true, env = "KILN_PROJECT_DIR", default_value = ".")]
  pub project_dir: PathBuf,

  /// Directory for stamps, depfiles and the file cache [default: derived from mode, platform and defines]
  #[arg(long, global = true, env = "KILN_BUILD_DIR")]
  pub build_dir: Option<PathBuf>,

  /// Directory final outputs are copied to [default: <project dir>/build]
  #[arg(long, global = true, env = "KILN_OUTPUT_DIR")]
  pub output_dir: Option<PathBuf>,

  /// Root directory of the toolchain [default: the project directory]
  #[arg(long, global = true, env = "KILN_ROOT_DIR")]
  pub root_dir: Option<PathBuf>,

  /// Build mode
  #[arg(long, global = true, env = "KILN_MODE", default_value_t = BuildMode::Debug)]
  pub mode: BuildMode,

  /// Target platform [default: the host platform]
  #[arg(long, global = true, env = "KILN_PLATFORM")]
  pub platform: Option<TargetPlatform>,

  /// Define exported to commands as KILN_DEFINE_<KEY> (repeatable)
  #[arg(
    short = 'D',
    long = "define",
    global = true,
    env = "KILN_DEFINES",
    value_delimiter = ',',
    value_name = "KEY=VALUE",
    value_parser = parse_define
  )]
  pub defines: Vec<(String, String)>,

  /// Maximum number of targets running at once (0 = one per CPU)
  #[arg(short, long, global = true, env = "KILN_JOBS", default_value_t = 1)]
  pub jobs: usize,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{s}'")),
  }
}

impl ProjectArgs {
  pub fn project_dir(&self) -> Result<PathBuf> {
    dunce::canonicalize(&self.project_dir)
      .with_context(|| format!("Project directory not found: {}", self.project_dir.display()))
  }

  pub fn manifest_path(&self) -> Result<PathBuf> {
    match &self.manifest {
      Some(path) => absolute(path),
      None => Ok(self.project_dir()?.join(DEFAULT_MANIFEST_NAME)),
    }
  }

  pub fn load_targets(&self) -> Result<TargetSet> {
    let path = self.manifest_path()?;
    let manifest = Manifest::load(&path)?;
    manifest
      .into_targets()
      .with_context(|| format!("Invalid manifest {}", path.display()))
  }

  pub fn environment(&self) -> Result<Environment> {
    let mut builder = Environment::builder(self.project_dir()?)
      .mode(self.mode)
      .defines(self.defines.iter().cloned());

    if let Some(platform) = self.platform {
      builder = builder.platform(platform);
    }
    if let Some(dir) = &self.build_dir {
      builder = builder.build_dir(absolute(dir)?);
    }
    if let Some(dir) = &self.output_dir {
      builder = builder.output_dir(absolute(dir)?);
    }
    if let Some(dir) = &self.root_dir {
      builder = builder.root_dir(absolute(dir)?);
    }

    builder.build().context("Failed to configure build environment")
  }
}

fn absolute(path: &Path) -> Result<PathBuf> {
  std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))
}
