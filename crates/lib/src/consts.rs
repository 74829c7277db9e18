//! Constants shared across the crate.

pub const APP_NAME: &str = "kiln";

/// File holding `path : hash` lines, relative to the build directory.
pub const FILE_CACHE_NAME: &str = ".filecache";

/// File holding the cache format version, relative to the build directory.
pub const FILE_CACHE_VERSION_NAME: &str = ".filecache_version";

/// Bump whenever the `.filecache` layout or the digest algorithm changes.
pub const FILE_CACHE_VERSION: &str = "kiln-filecache-1";

/// Extension of the per-target stamp files written to the build directory.
pub const STAMP_EXTENSION: &str = "stamp";

/// Length of the truncated hash used to derive build directory names.
pub const BUILD_KEY_LEN: usize = 20;

/// Directory (relative to the project) holding derived build directories.
pub const DEFAULT_BUILD_ROOT: &str = ".kiln/build";

/// Manifest file looked up in the project directory when none is given.
pub const DEFAULT_MANIFEST_NAME: &str = "kiln.json";
