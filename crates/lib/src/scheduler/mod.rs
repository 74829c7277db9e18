//! Incremental execution of a target and its dependencies.
//!
//! The scheduler expands the requested target into a [`BuildGraph`], then
//! walks the graph's waves. For every target it decides whether the target is
//! stale, runs the action if so, verifies the declared outputs and records the
//! new digests. The file cache is persisted exactly once, after every target
//! finished. Any error abandons the rest of the schedule without persisting.
//!
//! Within a wave, up to [`SchedulerConfig::parallelism`] targets run at once on
//! blocking tasks. Targets already running when another one fails are allowed
//! to finish; no new target starts.

mod stamp;
mod types;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::cache::FileHasher;
use crate::depfile::Depfile;
use crate::environment::Environment;
use crate::graph::BuildGraph;
use crate::target::{Target, TargetSet};
use crate::util::hash::list_files;

pub use stamp::Stamp;
pub use types::{BuildError, BuildSummary, CyclePath, SchedulerConfig, StaleReason, TargetReport, TargetStatus};

/// Drives builds against a shared [`FileHasher`].
///
/// The hasher must have been initialized by the caller; the scheduler only
/// reads and records digests and persists at the end of a successful build.
pub struct Scheduler {
  hasher: Arc<FileHasher>,
  config: SchedulerConfig,
}

impl Scheduler {
  pub fn new(hasher: Arc<FileHasher>, config: SchedulerConfig) -> Self {
    Self { hasher, config }
  }

  /// Build `root` and everything it depends on.
  ///
  /// Unknown targets, cycles and unsupported mode/platform combinations are
  /// reported before any action runs.
  pub async fn build(
    &self,
    targets: &TargetSet,
    root: &str,
    env: Arc<Environment>,
  ) -> Result<BuildSummary, BuildError> {
    let started = Instant::now();
    info!(root, mode = %env.mode(), platform = %env.platform(), "starting build");

    let graph = BuildGraph::expand(targets, root)?;
    for target in graph.topological_order() {
      if !target.supports(&env) {
        return Err(BuildError::InvalidBuild {
          target: target.name().to_string(),
          mode: env.mode(),
          platform: env.platform(),
        });
      }
    }

    let waves = graph.waves();
    info!(targets = graph.len(), waves = waves.len(), "computed execution waves");

    let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
    let mut reports = Vec::with_capacity(graph.len());

    for (wave_idx, wave) in waves.into_iter().enumerate() {
      debug!(wave = wave_idx, targets = wave.len(), "executing wave");

      let mut failure = None;
      for result in self.run_wave(wave, &env, &semaphore).await {
        match result {
          Ok(report) => reports.push(report),
          Err(e) => {
            error!(error = %e, "target failed");
            failure.get_or_insert(e);
          }
        }
      }

      if let Some(e) = failure {
        warn!(wave = wave_idx, "aborting build, file cache not persisted");
        return Err(e);
      }
    }

    self.hasher.persist().map_err(BuildError::Persist)?;

    let summary = BuildSummary {
      targets: reports,
      elapsed: started.elapsed(),
    };
    info!(
      built = summary.built_count(),
      skipped = summary.skipped_count(),
      elapsed_ms = summary.elapsed.as_millis() as u64,
      "build complete"
    );
    Ok(summary)
  }

  /// Run one wave. Results are returned in wave order; targets that were never
  /// started because of an earlier failure are absent.
  async fn run_wave(
    &self,
    wave: Vec<Arc<Target>>,
    env: &Arc<Environment>,
    semaphore: &Arc<Semaphore>,
  ) -> Vec<Result<TargetReport, BuildError>> {
    let failed = Arc::new(AtomicBool::new(false));
    let mut join_set = JoinSet::new();
    let mut spawned: HashMap<task::Id, (usize, String)> = HashMap::new();
    let total = wave.len();

    for (position, target) in wave.into_iter().enumerate() {
      // Permits are taken in wave order so targets start deterministically.
      let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
        break;
      };
      if failed.load(Ordering::SeqCst) {
        debug!(skipped = total - position, "not starting remaining targets");
        break;
      }

      let env = Arc::clone(env);
      let hasher = Arc::clone(&self.hasher);
      let task_failed = Arc::clone(&failed);
      let name = target.name().to_string();
      let label = name.clone();

      let handle = join_set.spawn(async move {
        let result = match task::spawn_blocking(move || run_target(&target, &env, &hasher)).await {
          Ok(result) => result,
          Err(e) => Err(BuildError::Join {
            target: name,
            message: e.to_string(),
          }),
        };
        if result.is_err() {
          task_failed.store(true, Ordering::SeqCst);
        }
        drop(permit);
        result
      });
      spawned.insert(handle.id(), (position, label));
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next_with_id().await {
      match joined {
        Ok((id, result)) => {
          if let Some((position, _)) = spawned.remove(&id) {
            results.push((position, result));
          }
        }
        Err(e) => {
          failed.store(true, Ordering::SeqCst);
          let (position, name) = spawned
            .remove(&e.id())
            .unwrap_or((usize::MAX, String::from("<unknown>")));
          error!(name = %name, error = %e, "wave task panicked");
          results.push((
            position,
            Err(BuildError::Join {
              target: name,
              message: e.to_string(),
            }),
          ));
        }
      }
    }

    results.sort_by_key(|(position, _)| *position);
    results.into_iter().map(|(_, result)| result).collect()
  }
}

/// Decide whether one target is stale and rebuild it if so.
fn run_target(target: &Target, env: &Environment, hasher: &FileHasher) -> Result<TargetReport, BuildError> {
  let started = Instant::now();
  let name = target.name();

  let inputs = resolve_inputs(target, env)?;
  let outputs = target.outputs(env).map_err(|source| BuildError::Pattern {
    target: name.to_string(),
    source,
  })?;

  let stamp_path = target.stamp_path(env);
  let previous = Stamp::load(&stamp_path);

  let status = match stale_reason(target, env, hasher, &inputs, &outputs, previous.as_ref())? {
    None => {
      debug!(name, "up to date");
      TargetStatus::Skipped
    }
    Some(reason) => {
      info!(name, reason = %reason, "building target");
      execute(target, env, hasher, &inputs, &outputs, previous.as_ref())?;
      Stamp::new(inputs, outputs)
        .write(&stamp_path)
        .map_err(|source| BuildError::Io {
          target: name.to_string(),
          path: stamp_path.clone(),
          source,
        })?;
      TargetStatus::Built(reason)
    }
  };

  let elapsed = started.elapsed();
  debug!(name, elapsed_ms = elapsed.as_millis() as u64, "target finished");
  Ok(TargetReport {
    name: name.to_string(),
    status,
    elapsed,
  })
}

/// Resolve declared inputs, expanding directories to the files below them.
fn resolve_inputs(target: &Target, env: &Environment) -> Result<Vec<PathBuf>, BuildError> {
  let name = target.name();
  let declared = target.inputs(env).map_err(|source| BuildError::Pattern {
    target: name.to_string(),
    source,
  })?;

  let mut inputs = Vec::with_capacity(declared.len());
  for path in declared {
    if path.is_dir() {
      let files = list_files(&path).map_err(|source| BuildError::Listing {
        target: name.to_string(),
        source,
      })?;
      inputs.extend(files);
    } else if path.exists() {
      inputs.push(path);
    } else {
      return Err(BuildError::MissingInput {
        target: name.to_string(),
        path,
      });
    }
  }
  Ok(inputs)
}

/// Inputs recorded by the target's depfiles from its previous run, split into
/// those that still exist and those that were removed.
fn depfile_inputs(target: &Target, env: &Environment) -> Result<(Vec<PathBuf>, Vec<PathBuf>), BuildError> {
  let mut present = Vec::new();
  let mut missing = Vec::new();
  for path in target.depfile_paths(env) {
    let depfile = Depfile::parse(&path).map_err(|source| BuildError::Depfile {
      target: target.name().to_string(),
      source,
    })?;
    for input in depfile.inputs() {
      let input = env.project_dir().join(input);
      if input.is_file() {
        present.push(input);
      } else {
        missing.push(input);
      }
    }
  }
  Ok((present, missing))
}

fn stale_reason(
  target: &Target,
  env: &Environment,
  hasher: &FileHasher,
  inputs: &[PathBuf],
  outputs: &[PathBuf],
  previous: Option<&Stamp>,
) -> Result<Option<StaleReason>, BuildError> {
  let cache_err = |source| BuildError::Cache {
    target: target.name().to_string(),
    source,
  };

  if target.is_empty() {
    return Ok(Some(StaleReason::NoDeclaredFiles));
  }
  let Some(stamp) = previous else {
    return Ok(Some(StaleReason::FirstRun));
  };
  if !stamp.matches(inputs, outputs) {
    return Ok(Some(StaleReason::FilesChanged));
  }
  if let Some(missing) = outputs.iter().find(|path| !path.exists()) {
    return Ok(Some(StaleReason::OutputMissing(missing.clone())));
  }

  let (discovered, removed) = depfile_inputs(target, env)?;
  if let Some(path) = removed.into_iter().next() {
    return Ok(Some(StaleReason::InputChanged(path)));
  }

  let mut tracked = inputs.to_vec();
  tracked.extend(discovered);
  if let Some(path) = hasher.hash_files(&tracked).map_err(cache_err)?.into_iter().next() {
    return Ok(Some(StaleReason::InputChanged(path)));
  }
  if let Some(path) = hasher.hash_files(outputs).map_err(cache_err)?.into_iter().next() {
    return Ok(Some(StaleReason::OutputChanged(path)));
  }

  Ok(None)
}

/// Run the action and check what it left behind.
fn execute(
  target: &Target,
  env: &Environment,
  hasher: &FileHasher,
  inputs: &[PathBuf],
  outputs: &[PathBuf],
  previous: Option<&Stamp>,
) -> Result<(), BuildError> {
  let name = target.name();
  let io_err = |path: &PathBuf| {
    let path = path.clone();
    move |source| BuildError::Io {
      target: name.to_string(),
      path,
      source,
    }
  };

  // A run that fails past this point must leave no stamp behind.
  let stamp_path = target.stamp_path(env);
  if stamp_path.exists() {
    std::fs::remove_file(&stamp_path).map_err(io_err(&stamp_path))?;
  }

  // Depfiles left over from the last run must not satisfy this run's contract.
  let depfile_paths = target.depfile_paths(env);
  for path in &depfile_paths {
    if path.exists() {
      std::fs::remove_file(path).map_err(io_err(path))?;
    }
  }

  let output = target.build(env).map_err(|source| BuildError::ActionFailed {
    target: name.to_string(),
    source,
  })?;

  if let Some(undeclared) = output.depfiles.keys().find(|key| !target.depfiles().contains(*key)) {
    return Err(BuildError::UndeclaredDepfile {
      target: name.to_string(),
      name: undeclared.clone(),
    });
  }

  let depfile_err = |source| BuildError::Depfile {
    target: name.to_string(),
    source,
  };
  let mut discovered = Vec::new();
  for (declared, path) in target.depfiles().iter().zip(&depfile_paths) {
    let depfile = match output.depfiles.get(declared) {
      Some(depfile) => {
        depfile.write(path).map_err(depfile_err)?;
        depfile.clone()
      }
      None if path.exists() => Depfile::parse(path).map_err(depfile_err)?,
      None => {
        return Err(BuildError::MissingDepfile {
          target: name.to_string(),
          name: declared.clone(),
        });
      }
    };
    debug!(name, depfile = %path.display(), inputs = depfile.inputs().len(), "recorded depfile");
    discovered.extend(
      depfile
        .inputs()
        .iter()
        .map(|input| env.project_dir().join(input))
        .filter(|input| input.is_file()),
    );
  }

  if let Some(missing) = outputs.iter().find(|path| !path.exists()) {
    return Err(BuildError::MissingOutput {
      target: name.to_string(),
      path: missing.clone(),
    });
  }

  let mut tracked = inputs.to_vec();
  tracked.extend(discovered);
  tracked.extend(outputs.iter().filter(|path| path.is_file()).cloned());
  hasher.hash_files(&tracked).map_err(|source| BuildError::Cache {
    target: name.to_string(),
    source,
  })?;

  if let Some(previous) = previous {
    for stale in previous
      .outputs
      .iter()
      .filter(|path| !outputs.contains(*path) && !inputs.contains(*path))
    {
      match std::fs::remove_file(stale) {
        Ok(()) => info!(name, path = %stale.display(), "removed output no longer declared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(name, path = %stale.display(), error = %e, "failed to remove stale output"),
      }
    }
  }

  Ok(())
}
