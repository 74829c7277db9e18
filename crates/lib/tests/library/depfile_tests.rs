//! Inputs discovered at build time through depfiles.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiln_lib::{ActionOutput, BuildError, Depfile, StaleReason, Target, TargetError, TargetStatus};

use super::common::{Project, count, counter, targets};

/// Concatenates `main.src` and every existing file it names on an
/// `include <file>` line, recording the includes in `compile.d`.
fn compile_target(runs: &Arc<AtomicUsize>) -> Target {
  let runs = Arc::clone(runs);
  Target::new("compile")
    .input("main.src")
    .output("{BUILD_DIR}/main.out")
    .depfile("compile.d")
    .action(move |env| {
      runs.fetch_add(1, Ordering::SeqCst);
      let main = fs::read_to_string(env.project_dir().join("main.src"))?;
      let out_path = env.build_dir().join("main.out");
      let mut out = main.clone();
      let mut depfile = Depfile::default();
      depfile.track_output(&out_path);
      for include in main.lines().filter_map(|line| line.strip_prefix("include ")) {
        let path = env.project_dir().join(include.trim());
        if let Ok(content) = fs::read_to_string(&path) {
          if content.contains("bad") {
            return Err(TargetError::Failed(format!("{} is broken", path.display())));
          }
          out.push_str(&content);
          depfile.track_input(path);
        }
      }
      fs::create_dir_all(env.build_dir())?;
      fs::write(out_path, out)?;
      Ok(ActionOutput::default().with_depfile("compile.d", depfile))
    })
}

#[tokio::test]
async fn discovered_input_change_rebuilds() {
  let project = Project::new();
  project.write("main.src", "include header.h\n");
  project.write("header.h", "v1\n");
  let runs = counter();
  let set = targets([compile_target(&runs)]);

  project.build(&set, "compile").await.unwrap();
  let skipped = project.build(&set, "compile").await.unwrap();
  assert!(!skipped.was_built("compile"));

  project.write("header.h", "v2\n");
  let summary = project.build(&set, "compile").await.unwrap();
  assert_eq!(
    summary.report("compile").unwrap().status,
    TargetStatus::Built(StaleReason::InputChanged(project.path("header.h")))
  );
  assert_eq!(count(&runs), 2);
}

#[tokio::test]
async fn depfile_is_written_to_build_dir() {
  let project = Project::new();
  project.write("main.src", "include header.h\n");
  project.write("header.h", "v1\n");
  let set = targets([compile_target(&counter())]);

  project.build(&set, "compile").await.unwrap();

  let depfile = Depfile::parse(&project.build_path("compile.d")).unwrap();
  assert_eq!(depfile.inputs(), &[project.path("header.h")]);
  assert_eq!(depfile.outputs(), &[project.build_path("main.out")]);
}

#[tokio::test]
async fn removed_discovered_input_marks_stale() {
  let project = Project::new();
  project.write("main.src", "include header.h\n");
  project.write("header.h", "v1\n");
  let runs = counter();
  let set = targets([compile_target(&runs)]);

  project.build(&set, "compile").await.unwrap();
  project.remove("header.h");

  let summary = project.build(&set, "compile").await.unwrap();
  assert!(summary.was_built("compile"));
  assert!(Depfile::parse(&project.build_path("compile.d")).unwrap().inputs().is_empty());
}

#[tokio::test]
async fn newly_discovered_input_is_tracked() {
  let project = Project::new();
  project.write("main.src", "plain\n");
  let runs = counter();
  let set = targets([compile_target(&runs)]);
  project.build(&set, "compile").await.unwrap();

  project.write("main.src", "include extra.h\n");
  project.write("extra.h", "x\n");
  project.build(&set, "compile").await.unwrap();
  assert!(!project.build(&set, "compile").await.unwrap().was_built("compile"));

  project.write("extra.h", "y\n");
  assert!(project.build(&set, "compile").await.unwrap().was_built("compile"));
  assert_eq!(count(&runs), 3);
}

#[tokio::test]
async fn undeclared_depfile_is_a_configuration_error() {
  let project = Project::new();
  let set = targets([Target::new("gen")
    .action(|_| Ok(ActionOutput::default().with_depfile("other.d", Depfile::default())))]);

  let err = project.build(&set, "gen").await.unwrap_err();
  assert_eq!(err.to_string(), "target 'gen' returned undeclared depfile 'other.d'");
}

#[tokio::test]
async fn declared_depfile_not_produced_fails() {
  let project = Project::new();
  let set = targets([Target::new("gen").depfile("gen.d")]);

  let err = project.build(&set, "gen").await.unwrap_err();
  assert!(matches!(err, BuildError::MissingDepfile { ref name, .. } if name == "gen.d"));
  assert!(!project.build_path(".filecache").exists());
}

#[tokio::test]
async fn failed_rebuild_keeps_discovered_inputs_tracked() {
  let project = Project::new();
  project.write("main.src", "include header.h\n");
  project.write("header.h", "v1\n");
  let runs = counter();
  let set = targets([compile_target(&runs)]);
  project.build(&set, "compile").await.unwrap();

  project.write("header.h", "bad\n");
  let err = project.build(&set, "compile").await.unwrap_err();
  assert!(matches!(err, BuildError::ActionFailed { ref target, .. } if target == "compile"));
  assert!(!project.build_path("compile.stamp").exists());

  project.write("header.h", "v3\n");
  let summary = project.build(&set, "compile").await.unwrap();
  assert_eq!(
    summary.report("compile").unwrap().status,
    TargetStatus::Built(StaleReason::FirstRun)
  );
  assert_eq!(count(&runs), 3);
  assert_eq!(
    fs::read_to_string(project.build_path("main.out")).unwrap(),
    "include header.h\nv3\n"
  );
}
