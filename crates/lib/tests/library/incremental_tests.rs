//! Change detection across build invocations.

use std::fs;

use kiln_lib::consts::FILE_CACHE_VERSION;
use kiln_lib::util::hash::hash_file;
use kiln_lib::{BuildError, StaleReason, Target, TargetError, TargetStatus};

use super::common::{Project, copy_target, count, counter, counting_target, targets};

#[tokio::test]
async fn second_build_is_a_no_op() {
  let project = Project::new();
  project.write("in.txt", "hello");
  let runs = counter();
  let set = targets([copy_target("copy", "in.txt", "out.txt", &runs)]);

  let first = project.build(&set, "copy").await.unwrap();
  assert_eq!(first.built(), vec!["copy"]);

  let second = project.build(&set, "copy").await.unwrap();
  assert_eq!(second.built_count(), 0);
  assert_eq!(second.report("copy").unwrap().status, TargetStatus::Skipped);
  assert_eq!(count(&runs), 1);
}

#[tokio::test]
async fn same_size_content_change_rebuilds() {
  let project = Project::new();
  project.write("in.txt", "aaaa");
  let runs = counter();
  let set = targets([copy_target("copy", "in.txt", "out.txt", &runs)]);

  project.build(&set, "copy").await.unwrap();
  project.write("in.txt", "bbbb");

  let summary = project.build(&set, "copy").await.unwrap();
  assert_eq!(
    summary.report("copy").unwrap().status,
    TargetStatus::Built(StaleReason::InputChanged(project.path("in.txt")))
  );
  assert_eq!(project.read("out.txt"), "bbbb");
  assert_eq!(count(&runs), 2);
}

#[tokio::test]
async fn deleted_output_forces_rebuild() {
  let project = Project::new();
  project.write("in.txt", "hello");
  let runs = counter();
  let set = targets([copy_target("copy", "in.txt", "out.txt", &runs)]);

  project.build(&set, "copy").await.unwrap();
  project.remove("out.txt");

  let summary = project.build(&set, "copy").await.unwrap();
  assert_eq!(
    summary.report("copy").unwrap().status,
    TargetStatus::Built(StaleReason::OutputMissing(project.path("out.txt")))
  );
  assert!(project.path("out.txt").exists());
}

#[tokio::test]
async fn change_propagates_to_dependents_only() {
  let project = Project::new();
  project.write("a.txt", "a");
  project.write("b.txt", "b");
  let (gen_runs, bundle_runs, other_runs) = (counter(), counter(), counter());
  let set = targets([
    copy_target("bundle", "gen.txt", "bundle.txt", &bundle_runs)
      .depends_on("gen")
      .depends_on("other"),
    copy_target("gen", "a.txt", "gen.txt", &gen_runs),
    copy_target("other", "b.txt", "other.txt", &other_runs),
  ]);

  project.build(&set, "bundle").await.unwrap();
  project.write("a.txt", "changed");

  let summary = project.build(&set, "bundle").await.unwrap();
  assert_eq!(summary.built(), vec!["gen", "bundle"]);
  assert_eq!(project.read("bundle.txt"), "changed");
  assert_eq!((count(&gen_runs), count(&bundle_runs), count(&other_runs)), (2, 2, 1));
}

#[tokio::test]
async fn identical_rebuilt_output_keeps_dependent_up_to_date() {
  let project = Project::new();
  project.write("a.txt", "same");
  let (gen_runs, bundle_runs) = (counter(), counter());
  let set = targets([
    copy_target("bundle", "gen.txt", "bundle.txt", &bundle_runs).depends_on("gen"),
    copy_target("gen", "a.txt", "gen.txt", &gen_runs),
  ]);

  project.build(&set, "bundle").await.unwrap();
  project.remove("gen.txt");

  let summary = project.build(&set, "bundle").await.unwrap();
  assert!(summary.was_built("gen"));
  assert!(!summary.was_built("bundle"));
  assert_eq!(count(&bundle_runs), 1);
}

#[tokio::test]
async fn target_without_declared_files_always_runs() {
  let project = Project::new();
  let runs = counter();
  let set = targets([counting_target("phony", &runs)]);

  for _ in 0..3 {
    let summary = project.build(&set, "phony").await.unwrap();
    assert_eq!(
      summary.report("phony").unwrap().status,
      TargetStatus::Built(StaleReason::NoDeclaredFiles)
    );
  }
  assert_eq!(count(&runs), 3);
}

#[tokio::test]
async fn persisted_cache_round_trips() {
  let project = Project::new();
  project.write("in.txt", "hello");
  let runs = counter();
  let set = targets([copy_target("copy", "in.txt", "out.txt", &runs)]);
  project.build(&set, "copy").await.unwrap();

  let version = fs::read_to_string(project.build_path(".filecache_version")).unwrap();
  assert_eq!(version, FILE_CACHE_VERSION);

  let cache = fs::read_to_string(project.build_path(".filecache")).unwrap();
  let input = project.path("in.txt");
  let expected = format!("{} : {}", input.display(), hash_file(&input).unwrap());
  assert!(cache.lines().any(|line| line == expected), "cache was:\n{cache}");

  let hasher = project.hasher();
  assert_eq!(hasher.len(), 2);
  assert_eq!(hasher.previous_hash(&input), Some(hash_file(&input).unwrap()));
  let output = project.path("out.txt");
  assert_eq!(hasher.previous_hash(&output), Some(hash_file(&output).unwrap()));
}

#[tokio::test]
async fn version_mismatch_discards_cache() {
  let project = Project::new();
  project.write("in.txt", "hello");
  let runs = counter();
  let set = targets([copy_target("copy", "in.txt", "out.txt", &runs)]);
  project.build(&set, "copy").await.unwrap();

  fs::write(project.build_path(".filecache_version"), "some-older-format").unwrap();
  let hasher = project.hasher();
  assert!(hasher.is_empty());
  assert!(!project.build_path(".filecache").exists());

  let summary = project.build(&set, "copy").await.unwrap();
  assert!(summary.was_built("copy"));
  assert_eq!(count(&runs), 2);
}

#[tokio::test]
async fn missing_input_fails_without_running_action() {
  let project = Project::new();
  let runs = counter();
  let set = targets([copy_target("copy", "missing.txt", "out.txt", &runs)]);

  let err = project.build(&set, "copy").await.unwrap_err();
  match err {
    BuildError::MissingInput { target, path } => {
      assert_eq!(target, "copy");
      assert_eq!(path, project.path("missing.txt"));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(count(&runs), 0);
}

#[tokio::test]
async fn failed_build_does_not_persist() {
  let project = Project::new();
  project.write("in.txt", "hello");
  let runs = counter();
  let set = targets([
    Target::new("broken")
      .depends_on("copy")
      .action(|_| Err(TargetError::Failed("compiler crashed".to_string()))),
    copy_target("copy", "in.txt", "out.txt", &runs),
  ]);

  let err = project.build(&set, "broken").await.unwrap_err();
  assert!(matches!(err, BuildError::ActionFailed { ref target, .. } if target == "broken"));
  assert_eq!(count(&runs), 1);
  assert!(!project.build_path(".filecache").exists());
  assert!(project.hasher().is_empty());
}

#[tokio::test]
async fn unsupported_environment_runs_nothing() {
  let project = Project::new();
  let (aot_runs, app_runs) = (counter(), counter());
  let set = targets([
    counting_target("app", &app_runs).depends_on("aot"),
    counting_target("aot", &aot_runs).modes([kiln_lib::BuildMode::Release]),
  ]);

  let err = project.build(&set, "app").await.unwrap_err();
  assert_eq!(
    err.to_string(),
    "target 'aot' does not support debug builds for linux-x64"
  );
  assert_eq!((count(&aot_runs), count(&app_runs)), (0, 0));
}
