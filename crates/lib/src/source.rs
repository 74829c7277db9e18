//! Input and output declarations of a target.
//!
//! A [`Source`] is either a path pattern or a reference to a prebuilt
//! artifact. Patterns may contain variables that are substituted from the
//! [`Environment`] before any file is touched.
//!
//! # Variables
//!
//! - `{PROJECT_DIR}` - the project being built
//! - `{BUILD_DIR}` - the configuration-specific build directory
//! - `{OUTPUT_DIR}` - where final artifacts are copied
//! - `{ROOT_DIR}` - the toolchain root
//!
//! # Escaping
//!
//! Use `{{` to produce a literal `{`. A lone `}` passes through unchanged.
//!
//! Relative results are resolved against the project directory.
//!
//! # Example
//!
//! ```
//! use kiln_lib::source::{parse, Segment, Variable};
//!
//! let segments = parse("{BUILD_DIR}/app.dill").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Variable(Variable::BuildDir),
//!     Segment::Literal("/app.dill".to_string()),
//! ]);
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::environment::{ArtifactError, Environment};

/// A variable that can appear inside a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
  ProjectDir,
  BuildDir,
  OutputDir,
  RootDir,
}

impl Variable {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "PROJECT_DIR" => Some(Self::ProjectDir),
      "BUILD_DIR" => Some(Self::BuildDir),
      "OUTPUT_DIR" => Some(Self::OutputDir),
      "ROOT_DIR" => Some(Self::RootDir),
      _ => None,
    }
  }

  fn value(self, env: &Environment) -> String {
    let dir = match self {
      Self::ProjectDir => env.project_dir(),
      Self::BuildDir => env.build_dir(),
      Self::OutputDir => env.output_dir(),
      Self::RootDir => env.root_dir(),
    };
    dir.display().to_string()
  }
}

/// A segment of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Variable(Variable),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
  #[error("unclosed variable at position {position} in '{pattern}'")]
  Unclosed { pattern: String, position: usize },

  #[error("unknown variable '{name}' in '{pattern}'")]
  UnknownVariable { pattern: String, name: String },

  #[error("empty pattern")]
  Empty,

  #[error(transparent)]
  Artifact(#[from] ArtifactError),
}

/// Parse a pattern into literal and variable segments.
///
/// # Errors
///
/// Returns an error if a variable is unclosed or unknown, or if the pattern is empty.
pub fn parse(pattern: &str) -> Result<Vec<Segment>, PatternError> {
  if pattern.is_empty() {
    return Err(PatternError::Empty);
  }

  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = pattern.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '{' {
      literal.push(ch);
      continue;
    }

    if let Some((_, '{')) = chars.peek() {
      chars.next();
      literal.push('{');
      continue;
    }

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }

    let mut name = String::new();
    let mut found_close = false;
    for (_, c) in chars.by_ref() {
      if c == '}' {
        found_close = true;
        break;
      }
      name.push(c);
    }

    if !found_close {
      return Err(PatternError::Unclosed {
        pattern: pattern.to_string(),
        position: pos,
      });
    }

    let variable = Variable::from_name(&name).ok_or_else(|| PatternError::UnknownVariable {
      pattern: pattern.to_string(),
      name,
    })?;
    segments.push(Segment::Variable(variable));
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Declared input or output of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  /// A path, possibly containing variables.
  Pattern(String),
  /// A prebuilt artifact looked up through the environment's locator.
  Artifact(String),
}

impl Source {
  pub fn pattern(pattern: impl Into<String>) -> Self {
    Self::Pattern(pattern.into())
  }

  pub fn artifact(artifact: impl Into<String>) -> Self {
    Self::Artifact(artifact.into())
  }

  /// Resolve to a concrete absolute path.
  pub fn resolve(&self, env: &Environment) -> Result<PathBuf, PatternError> {
    match self {
      Source::Pattern(pattern) => {
        let mut resolved = String::new();
        for segment in parse(pattern)? {
          match segment {
            Segment::Literal(text) => resolved.push_str(&text),
            Segment::Variable(variable) => resolved.push_str(&variable.value(env)),
          }
        }
        let path = PathBuf::from(resolved);
        let path = if path.is_absolute() {
          path
        } else {
          env.project_dir().join(path)
        };
        Ok(dunce::simplified(&path).to_path_buf())
      }
      Source::Artifact(artifact) => Ok(env.artifact_path(artifact)?),
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Source::Pattern(pattern) => write!(f, "{pattern}"),
      Source::Artifact(artifact) => write!(f, "artifact:{artifact}"),
    }
  }
}

impl From<&str> for Source {
  fn from(pattern: &str) -> Self {
    Source::pattern(pattern)
  }
}

impl From<String> for Source {
  fn from(pattern: String) -> Self {
    Source::Pattern(pattern)
  }
}
