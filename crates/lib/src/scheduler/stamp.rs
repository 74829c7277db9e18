//! Per-target record of the last successful execution.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Resolved file sets of a target's last successful run, stored as JSON at
/// `<build dir>/<target>.stamp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
  pub inputs: Vec<PathBuf>,
  pub outputs: Vec<PathBuf>,
}

impl Stamp {
  pub fn new(inputs: Vec<PathBuf>, outputs: Vec<PathBuf>) -> Self {
    Self { inputs, outputs }
  }

  /// Load a stamp. Missing or unreadable stamps yield `None`, which makes the
  /// target stale.
  pub fn load(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
      Ok(stamp) => Some(stamp),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "ignoring corrupt stamp");
        None
      }
    }
  }

  pub fn write(&self, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
    fs::write(path, json)
  }

  /// Whether the recorded sets equal the given ones, ignoring order.
  pub fn matches(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> bool {
    same_set(&self.inputs, inputs) && same_set(&self.outputs, outputs)
  }
}

fn same_set(a: &[PathBuf], b: &[PathBuf]) -> bool {
  let mut a: Vec<_> = a.iter().collect();
  let mut b: Vec<_> = b.iter().collect();
  a.sort();
  a.dedup();
  b.sort();
  b.dedup();
  a == b
}
