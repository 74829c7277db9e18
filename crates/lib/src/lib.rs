//! kiln-lib: incremental build graph
//!
//! This crate provides the pieces of a small dependency-aware build system:
//! - `Target`: a named unit of work with declared inputs, outputs and an action
//! - `Environment`: the immutable configuration shared by every target in a build
//! - `FileHasher`: content-addressed change detection with a persisted cache
//! - `Depfile`: dynamically discovered inputs recorded by an action
//! - `BuildGraph`: dependency expansion, cycle detection and execution waves
//! - `Scheduler`: incrementally executes a target graph
//! - `Manifest`: JSON target declarations backed by shell commands

pub mod cache;
pub mod command;
pub mod consts;
pub mod depfile;
pub mod environment;
pub mod graph;
pub mod manifest;
pub mod scheduler;
pub mod source;
pub mod target;
pub mod util;

pub use cache::{CacheError, FileHasher};
pub use depfile::{Depfile, DepfileError};
pub use environment::{BuildMode, Environment, EnvironmentBuilder, TargetPlatform};
pub use graph::BuildGraph;
pub use manifest::{Manifest, ManifestError};
pub use scheduler::{BuildError, BuildSummary, Scheduler, SchedulerConfig, StaleReason, TargetStatus};
pub use source::Source;
pub use target::{ActionOutput, Target, TargetError, TargetSet};
