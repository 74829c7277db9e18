//! Concurrency within waves and failure handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use kiln_lib::{ActionOutput, BuildError, SchedulerConfig, Target, TargetError};

use super::common::{Project, count, counter, counting_target, targets};

/// Tracks how many actions are running at once.
#[derive(Default)]
struct Gauge {
  active: AtomicUsize,
  peak: AtomicUsize,
}

impl Gauge {
  fn enter(&self) {
    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
  }

  fn exit(&self) {
    self.active.fetch_sub(1, Ordering::SeqCst);
  }

  fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }
}

/// Waits (bounded) until `expected` actions overlap, then leaves.
fn overlapping_target(name: &str, gauge: &Arc<Gauge>, expected: usize) -> Target {
  let gauge = Arc::clone(gauge);
  Target::new(name).action(move |_| {
    gauge.enter();
    let deadline = Instant::now() + Duration::from_secs(5);
    while gauge.peak() < expected && Instant::now() < deadline {
      thread::sleep(Duration::from_millis(5));
    }
    gauge.exit();
    Ok(ActionOutput::default())
  })
}

fn config(parallelism: usize) -> SchedulerConfig {
  SchedulerConfig { parallelism }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn independent_targets_overlap() {
  let project = Project::new();
  let gauge = Arc::new(Gauge::default());
  let set = targets([
    Target::new("all").depends_on("a").depends_on("b").depends_on("c"),
    overlapping_target("a", &gauge, 3),
    overlapping_target("b", &gauge, 3),
    overlapping_target("c", &gauge, 3),
  ]);

  let summary = project.build_with(&set, "all", config(4)).await.unwrap();
  assert_eq!(gauge.peak(), 3);
  assert_eq!(summary.built_count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallelism_bounds_concurrency() {
  let project = Project::new();
  let gauge = Arc::new(Gauge::default());
  let set = targets([
    Target::new("all").depends_on("a").depends_on("b").depends_on("c"),
    overlapping_target("a", &gauge, 2),
    overlapping_target("b", &gauge, 2),
    overlapping_target("c", &gauge, 2),
  ]);

  project.build_with(&set, "all", config(2)).await.unwrap();
  assert_eq!(gauge.peak(), 2);
}

#[tokio::test]
async fn default_config_runs_one_at_a_time() {
  let project = Project::new();
  let gauge = Arc::new(Gauge::default());
  let sleepy = |name: &str| {
    let gauge = Arc::clone(&gauge);
    Target::new(name).action(move |_| {
      gauge.enter();
      thread::sleep(Duration::from_millis(20));
      gauge.exit();
      Ok(ActionOutput::default())
    })
  };
  let set = targets([
    Target::new("all").depends_on("a").depends_on("b"),
    sleepy("a"),
    sleepy("b"),
  ]);

  project.build(&set, "all").await.unwrap();
  assert_eq!(gauge.peak(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn running_targets_finish_after_a_failure() {
  let project = Project::new();
  let (slow_done, root_runs) = (counter(), counter());
  let done = Arc::clone(&slow_done);
  let set = targets([
    counting_target("root", &root_runs).depends_on("fail").depends_on("slow"),
    Target::new("fail").action(|_| Err(TargetError::Failed("nope".to_string()))),
    Target::new("slow").action(move |_| {
      thread::sleep(Duration::from_millis(100));
      done.fetch_add(1, Ordering::SeqCst);
      Ok(ActionOutput::default())
    }),
  ]);

  let err = project.build_with(&set, "root", config(2)).await.unwrap_err();
  assert!(matches!(err, BuildError::ActionFailed { ref target, .. } if target == "fail"));
  assert_eq!(count(&slow_done), 1);
  assert_eq!(count(&root_runs), 0);
  assert!(!project.build_path(".filecache").exists());
}

#[tokio::test]
async fn sequential_failure_stops_the_wave() {
  let project = Project::new();
  let later_runs = counter();
  let set = targets([
    Target::new("root").depends_on("fail").depends_on("later"),
    Target::new("fail").action(|_| Err(TargetError::Failed("nope".to_string()))),
    counting_target("later", &later_runs),
  ]);

  project.build(&set, "root").await.unwrap_err();
  assert_eq!(count(&later_runs), 0);
}

#[tokio::test]
async fn panicking_action_names_its_target() {
  let project = Project::new();
  let later_runs = counter();
  let set = targets([
    Target::new("root").depends_on("boom").depends_on("later"),
    Target::new("boom").action(|_| panic!("action blew up")),
    counting_target("later", &later_runs),
  ]);

  let err = project.build(&set, "root").await.unwrap_err();
  assert!(matches!(err, BuildError::Join { ref target, .. } if target == "boom"));
  assert_eq!(err.target(), Some("boom"));
  assert_eq!(count(&later_runs), 0);
  assert!(!project.build_path(".filecache").exists());
}
