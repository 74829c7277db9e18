//! Implementation of the `kiln build` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::{FileHasher, Scheduler, SchedulerConfig, TargetStatus};

use super::ProjectArgs;
use crate::output::{format_duration, print_built, print_skipped, print_stat, print_success};

/// Build `target` and its dependencies, then print one line per target and a summary.
pub fn cmd_build(project: &ProjectArgs, target: &str) -> Result<()> {
  let targets = project.load_targets()?;
  let env = Arc::new(project.environment()?);
  debug!(build_dir = %env.build_dir().display(), "using build directory");

  let hasher = FileHasher::new(env.build_dir());
  hasher.initialize();
  let config = match project.jobs {
    0 => SchedulerConfig::parallel(),
    jobs => SchedulerConfig { parallelism: jobs },
  };
  debug!(parallelism = config.parallelism, "configured scheduler");
  let scheduler = Scheduler::new(Arc::new(hasher), config);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let summary = rt
    .block_on(scheduler.build(&targets, target, env))
    .with_context(|| format!("Build of '{target}' failed"))?;
  debug!(built = ?summary.built(), "build finished");

  for report in &summary.targets {
    match &report.status {
      TargetStatus::Built(reason) => print_built(&report.name, &reason.to_string(), report.elapsed),
      TargetStatus::Skipped => print_skipped(&report.name),
    }
  }

  println!();
  print_success(&format!("Built {target}"));
  print_stat("Targets built", &summary.built_count().to_string());
  print_stat("Up to date", &summary.skipped_count().to_string());
  print_stat("Duration", &format_duration(summary.elapsed));

  Ok(())
}
