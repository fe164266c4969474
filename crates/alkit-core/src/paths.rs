use dirs::{cache_dir, home_dir};
use std::path::{Path, PathBuf};

/// Returns the cache root, or None if neither a cache nor a home directory can be resolved.
pub fn try_cache_root() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("ALKIT_CACHE_DIR") {
        return Some(PathBuf::from(val));
    }
    cache_dir()
        .map(|c| c.join("alkit"))
        .or_else(|| home_dir().map(|h| h.join(".alkit").join("cache")))
}

/// Returns the artifact cache root (`ALKIT_CACHE_DIR`, else `<user cache>/alkit`).
///
/// Falls back to a relative `.alkit-cache` directory when the platform reports
/// neither a cache nor a home directory.
pub fn cache_root() -> PathBuf {
    try_cache_root().unwrap_or_else(|| PathBuf::from(".alkit-cache"))
}

/// Entry directory for a coarse version: `<root>/<version>`
pub fn entry_dir(root: &Path, coarse_version: &str) -> PathBuf {
    root.join(coarse_version)
}

/// Lock directory: `<root>/locks`
pub fn locks_dir(root: &Path) -> PathBuf {
    root.join("locks")
}

/// Lock file guarding population of one entry.
pub fn lock_path(root: &Path, coarse_version: &str) -> PathBuf {
    locks_dir(root).join(format!("{coarse_version}.lock"))
}
