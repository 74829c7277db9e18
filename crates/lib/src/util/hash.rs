//! Hashing utilities for change detection.
//!
//! This module provides:
//! - `ContentHash`: a full hex-encoded SHA-256 digest of file contents
//! - `hash_file()`: streaming single file hashing
//! - `hash_bytes()`: arbitrary byte hashing
//! - `Hashable`: truncated digests of serializable values, used for build keys
//! - `list_files()`: deterministic listing of the regular files below a directory

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::BUILD_KEY_LEN;

/// A full 64-character SHA-256 digest of a file's bytes.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  /// Accepts only well-formed digests (64 lowercase hex characters).
  pub fn parse(s: &str) -> Option<Self> {
    let valid = s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    valid.then(|| ContentHash(s.to_string()))
  }
}

/// Error while hashing or listing files.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to walk directory {path}: {message}")]
  WalkDir { path: PathBuf, message: String },

  #[error("failed to serialize value for hashing: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Truncated digest of a value's JSON serialization.
pub trait Hashable: Serialize {
  fn compute_key(&self) -> Result<String, HashError> {
    let serialized = serde_json::to_string(self)?;
    let full = hash_bytes(serialized.as_bytes());
    Ok(full.0[..BUILD_KEY_LEN].to_string())
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let read_err = |source| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// List every regular file below `dir`, sorted by path.
///
/// Symlinks are followed so that a linked asset directory is hashed by content.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, HashError> {
  let mut files = Vec::new();
  for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
    let entry = entry.map_err(|e| HashError::WalkDir {
      path: dir.to_path_buf(),
      message: e.to_string(),
    })?;
    if entry.file_type().is_file() {
      files.push(entry.into_path());
    }
  }
  files.sort();
  Ok(files)
}
