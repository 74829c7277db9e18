//! Persistent content-hash cache.
//!
//! `FileHasher` is the single source of truth for "did this file change". It
//! keeps two generations of digests:
//! - previous: loaded from `<cache dir>/.filecache` when the build starts
//! - current: computed during this build
//!
//! `persist()` folds current into previous and rewrites the cache file. The
//! cache is only trusted when `<cache dir>/.filecache_version` matches
//! [`FILE_CACHE_VERSION`]; anything else is treated as a cold cache.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{FILE_CACHE_NAME, FILE_CACHE_VERSION, FILE_CACHE_VERSION_NAME};
use crate::util::hash::{ContentHash, HashError, hash_file};

/// Separator between path and digest on each `.filecache` line.
const SEPARATOR: &str = " : ";

/// Errors raised by the file hasher.
#[derive(Debug, Error)]
pub enum CacheError {
  /// A file could not be hashed (typically deleted after it was discovered).
  #[error(transparent)]
  Hash(#[from] HashError),

  /// The cache or version marker could not be written.
  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Content hashes of build inputs and outputs, in two generations.
#[derive(Debug)]
pub struct FileHasher {
  cache_dir: PathBuf,
  previous: RwLock<HashMap<PathBuf, ContentHash>>,
  current: Mutex<HashMap<PathBuf, ContentHash>>,
}

impl FileHasher {
  /// Create a hasher storing its files in `cache_dir` (normally the build directory).
  ///
  /// Nothing is read until [`FileHasher::initialize`] is called.
  pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
    Self {
      cache_dir: cache_dir.into(),
      previous: RwLock::new(HashMap::new()),
      current: Mutex::new(HashMap::new()),
    }
  }

  pub fn cache_file(&self) -> PathBuf {
    self.cache_dir.join(FILE_CACHE_NAME)
  }

  pub fn version_file(&self) -> PathBuf {
    self.cache_dir.join(FILE_CACHE_VERSION_NAME)
  }

  /// Load the previous generation from disk.
  ///
  /// A missing cache is a cold start. A missing or mismatched version marker
  /// deletes the cache file. Unreadable or unparseable content is discarded
  /// with a warning. None of these cases is an error.
  pub fn initialize(&self) {
    let cache_file = self.cache_file();
    let mut previous = self.previous.write();
    previous.clear();

    if !self.version_matches() {
      if cache_file.exists() {
        info!(path = %cache_file.display(), "file cache version mismatch, discarding cache");
        if let Err(e) = fs::remove_file(&cache_file) {
          warn!(path = %cache_file.display(), error = %e, "failed to remove stale file cache");
        }
      }
      return;
    }

    let content = match fs::read_to_string(&cache_file) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %cache_file.display(), "no file cache, starting cold");
        return;
      }
      Err(e) => {
        warn!(path = %cache_file.display(), error = %e, "unreadable file cache, starting cold");
        return;
      }
    };

    match parse_cache(&content) {
      Some(entries) => {
        debug!(entries = entries.len(), "loaded file cache");
        *previous = entries;
      }
      None => {
        warn!(path = %cache_file.display(), "corrupt file cache, starting cold");
      }
    }
  }

  fn version_matches(&self) -> bool {
    match fs::read_to_string(self.version_file()) {
      Ok(version) => version.trim() == FILE_CACHE_VERSION,
      Err(_) => false,
    }
  }

  /// Hash `paths` and return those whose digest differs from the previous generation.
  ///
  /// Paths without a previous digest are dirty. Every computed digest is
  /// recorded in the current generation, dirty or not. Dirty paths are returned
  /// in input order. A file that cannot be read is an error.
  pub fn hash_files(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, CacheError> {
    let mut computed = Vec::with_capacity(paths.len());
    for path in paths {
      computed.push((path.clone(), hash_file(path)?));
    }

    let previous = self.previous.read();
    let dirty = computed
      .iter()
      .filter(|(path, hash)| previous.get(path) != Some(hash))
      .map(|(path, _)| path.clone())
      .collect();
    drop(previous);

    self.current.lock().extend(computed);
    Ok(dirty)
  }

  pub fn previous_hash(&self, path: &Path) -> Option<ContentHash> {
    self.previous.read().get(path).cloned()
  }

  pub fn current_hash(&self, path: &Path) -> Option<ContentHash> {
    self.current.lock().get(path).cloned()
  }

  /// Number of entries in the previous generation.
  pub fn len(&self) -> usize {
    self.previous.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.previous.read().is_empty()
  }

  /// Fold the current generation into the previous one and write both files.
  ///
  /// The version marker is written first, then the cache file is truncated and
  /// rewritten with one `path : hash` line per entry, sorted by path.
  pub fn persist(&self) -> Result<(), CacheError> {
    let mut previous = self.previous.write();
    previous.extend(self.current.lock().drain());

    fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Write {
      path: self.cache_dir.clone(),
      source,
    })?;

    let version_file = self.version_file();
    fs::write(&version_file, FILE_CACHE_VERSION).map_err(|source| CacheError::Write {
      path: version_file,
      source,
    })?;

    let mut entries: Vec<_> = previous.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let cache_file = self.cache_file();
    let write_err = |source| CacheError::Write {
      path: cache_file.clone(),
      source,
    };
    let mut out = BufWriter::new(fs::File::create(&cache_file).map_err(write_err)?);
    for (path, hash) in entries {
      writeln!(out, "{}{}{}", path.display(), SEPARATOR, hash).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    info!(entries = previous.len(), path = %cache_file.display(), "persisted file cache");
    Ok(())
  }
}

/// Parse `path : hash` lines. Returns `None` if any non-empty line is malformed.
fn parse_cache(content: &str) -> Option<HashMap<PathBuf, ContentHash>> {
  let mut entries = HashMap::new();
  for line in content.lines() {
    if line.trim().is_empty() {
      continue;
    }
    // Digests never contain the separator, so split from the right.
    let (path, hash) = line.rsplit_once(SEPARATOR)?;
    if path.is_empty() {
      return None;
    }
    entries.insert(PathBuf::from(path), ContentHash::parse(hash.trim())?);
  }
  Some(entries)
}
