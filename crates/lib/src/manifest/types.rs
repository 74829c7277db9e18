//! Serialized form of a build manifest.
//!
//! # Example
//!
//! ```json
//! {
//!   "targets": [
//!     {
//!       "name": "kernel_snapshot",
//!       "inputs": ["lib/main.dart"],
//!       "artifacts": ["frontend_server.dart.snapshot"],
//!       "outputs": ["{BUILD_DIR}/app.dill"],
//!       "depfiles": ["kernel_snapshot.d"],
//!       "command": "compile lib/main.dart -o $BUILD_DIR/app.dill",
//!       "modes": ["profile", "release"]
//!     },
//!     {
//!       "name": "bundle",
//!       "dependencies": ["kernel_snapshot"],
//!       "inputs": ["{BUILD_DIR}/app.dill"],
//!       "outputs": ["{OUTPUT_DIR}/app.dill"],
//!       "command": "cp $BUILD_DIR/app.dill $OUTPUT_DIR/app.dill"
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::environment::{BuildMode, TargetPlatform};

/// A list of target declarations, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  pub targets: Vec<TargetDef>,
}

/// One target as written in the manifest.
///
/// `inputs` and `outputs` are path patterns; `artifacts` are extra inputs
/// looked up through the environment's artifact locator. A target without a
/// `command` does nothing when it runs, which is useful for grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDef {
  pub name: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inputs: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub artifacts: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub outputs: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depfiles: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub command: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub modes: Option<Vec<BuildMode>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platforms: Option<Vec<TargetPlatform>>,
}
