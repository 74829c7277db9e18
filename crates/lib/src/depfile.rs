//! Makefile-style dependency files.
//!
//! A [`Depfile`] records the inputs an action discovered while it ran (for
//! example transitively included sources) so the next build can detect changes
//! to them. The on-disk syntax is the one Ninja and compilers use:
//!
//! ```text
//! output_1 [output_2 ...]: input_1 [input_2 ...]
//! ```
//!
//! Spaces inside paths are escaped with a backslash, and a backslash at the end
//! of a line continues the rule on the next line.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DepfileError {
  #[error("failed to read depfile {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write depfile {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed depfile {path}: no ':' separator in '{line}'")]
  Malformed { path: PathBuf, line: String },
}

/// Dynamically discovered inputs (and the outputs they produced).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Depfile {
  outputs: Vec<PathBuf>,
  inputs: Vec<PathBuf>,
}

impl Depfile {
  pub fn outputs(&self) -> &[PathBuf] {
    &self.outputs
  }

  pub fn inputs(&self) -> &[PathBuf] {
    &self.inputs
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty() && self.inputs.is_empty()
  }

  /// Declare that the action read this path.
  pub fn track_input(&mut self, input: impl Into<PathBuf>) {
    self.inputs.push(input.into())
  }

  /// Declare that the action wrote this path.
  pub fn track_output(&mut self, output: impl Into<PathBuf>) {
    self.outputs.push(output.into())
  }

  /// Read a depfile. A missing file yields an empty depfile.
  ///
  /// Multiple rules in one file are merged in order.
  pub fn parse(path: &Path) -> Result<Self, DepfileError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no depfile yet");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(DepfileError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    Self::parse_str(&content).map_err(|line| DepfileError::Malformed {
      path: path.to_path_buf(),
      line,
    })
  }

  /// Parse depfile text. On failure returns the offending line.
  pub fn parse_str(content: &str) -> Result<Self, String> {
    let joined = content.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut depfile = Self::default();

    for line in joined.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let split = find_separator(line).ok_or_else(|| line.to_string())?;
      depfile.outputs.extend(tokenize(&line[..split]).into_iter().map(PathBuf::from));
      depfile.inputs.extend(tokenize(&line[split + 1..]).into_iter().map(PathBuf::from));
    }

    Ok(depfile)
  }

  /// Write the depfile as a single rule, creating parent directories.
  pub fn write(&self, path: &Path) -> Result<(), DepfileError> {
    let write_err = |source| DepfileError::Write {
      path: path.to_path_buf(),
      source,
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, format!("{self}\n")).map_err(write_err)
  }
}

impl fmt::Display for Depfile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let join = |paths: &[PathBuf]| {
      paths
        .iter()
        .map(|p| escape(&p.display().to_string()))
        .collect::<Vec<_>>()
        .join(" ")
    };
    write!(f, "{}: {}", join(&self.outputs), join(&self.inputs))
  }
}

/// Index of the rule separator: the first unescaped ':' followed by
/// whitespace or the end of the line. Drive letters like `C:\` are skipped.
fn find_separator(line: &str) -> Option<usize> {
  let bytes = line.as_bytes();
  let mut escaped = false;
  for (i, &b) in bytes.iter().enumerate() {
    if escaped {
      escaped = false;
      continue;
    }
    match b {
      b'\\' => escaped = true,
      b':' if bytes.get(i + 1).is_none_or(|next| next.is_ascii_whitespace()) => return Some(i),
      _ => {}
    }
  }
  None
}

/// Split on unescaped whitespace and unescape `\ `, `\#` and `$$`.
fn tokenize(s: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();
  let mut chars = s.chars().peekable();

  while let Some(ch) = chars.next() {
    match ch {
      '\\' => match chars.peek() {
        Some(&next @ (' ' | '#' | '\\')) => {
          current.push(next);
          chars.next();
        }
        _ => current.push('\\'),
      },
      '$' if chars.peek() == Some(&'$') => {
        current.push('$');
        chars.next();
      }
      c if c.is_whitespace() => {
        if !current.is_empty() {
          tokens.push(std::mem::take(&mut current));
        }
      }
      c => current.push(c),
    }
  }
  if !current.is_empty() {
    tokens.push(current);
  }
  tokens
}

/// Inverse of [`tokenize`]. A backslash is doubled when it ends the path or
/// precedes a character `tokenize` would unescape.
fn escape(path: &str) -> String {
  let mut out = String::with_capacity(path.len());
  let mut chars = path.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '\\' if matches!(chars.peek(), None | Some(' ' | '#' | '\\')) => out.push_str("\\\\"),
      ' ' => out.push_str("\\ "),
      '#' => out.push_str("\\#"),
      '$' => out.push_str("$$"),
      c => out.push(c),
    }
  }
  out
}
