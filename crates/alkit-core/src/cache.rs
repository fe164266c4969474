//! On-disk artifact cache keyed by coarse platform version.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<coarse>/Microsoft.Dynamics.Framework.UI.Client.dll
//! <root>/<coarse>/Newtonsoft.Json.dll
//! <root>/<coarse>/compiler/alc[.exe] ...
//! <root>/<coarse>/.complete              completion marker, written last
//! <root>/locks/<coarse>.lock             advisory population lock
//! ```
//!
//! An entry is ready only when the marker and every required file exist. The
//! marker is the single source of truth across processes; population of one
//! version is serialized by the lock file.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::io::extract::{
    TARGET_FILES, TargetKind, extract_entry, extract_platform_subtree, local_span, select_best,
};
use crate::io::range::{RangeFetcher, RangeSource};
use crate::io::zip_index::{EOCD_SEARCH_SIZE, find_end_of_central_directory, parse_central_directory};
use crate::io::{blocking, cancellable};
use crate::paths::{entry_dir, lock_path, locks_dir};
use crate::release_index::VersionIndex;
use crate::reporter::{NullReporter, Reporter};
use alkit_schema::{ArchiveEntryRef, Platform};
use chrono::{DateTime, Utc};
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// File name of the completion marker inside an entry directory.
pub const MARKER_FILE: &str = ".complete";

/// Subdirectory the compiler subtree is unpacked into.
pub const COMPILER_DIR: &str = "compiler";

/// Written as the last step of population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub coarse_version: String,
    pub full_version: String,
    pub completed_at: DateTime<Utc>,
    pub platform: Platform,
    /// Required files, relative to the entry directory.
    pub files: Vec<String>,
}

/// Summary of one cache entry, for listing.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub version: String,
    pub path: PathBuf,
    pub ready: bool,
    pub marker: Option<CompletionMarker>,
    pub size_bytes: u64,
}

/// Holds the population lock for one entry until dropped.
struct EntryLock {
    _file: File,
}

pub struct ArtifactCache {
    settings: Settings,
    index: Arc<VersionIndex>,
    source: Arc<dyn RangeSource>,
    platform: Platform,
    reporter: Arc<dyn Reporter>,
}

impl ArtifactCache {
    /// A cache that resolves against the configured CDN over HTTP.
    pub fn new(settings: Settings, client: reqwest::Client) -> Self {
        let index = VersionIndex::new(client.clone(), settings.index_url(), settings.channel.clone());
        Self::with_parts(settings, Arc::new(index), Arc::new(RangeFetcher::new(client)))
    }

    /// A cache over an explicit release index and range source.
    pub fn with_parts(
        settings: Settings,
        index: Arc<VersionIndex>,
        source: Arc<dyn RangeSource>,
    ) -> Self {
        Self {
            settings,
            index,
            source,
            platform: Platform::current(),
            reporter: Arc::new(NullReporter),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Populate for a platform other than the running one.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn root(&self) -> &Path {
        &self.settings.cache_root
    }

    /// Directory of the entry for `coarse_version`, whether or not it exists.
    pub fn entry_path(&self, coarse_version: &str) -> PathBuf {
        entry_dir(self.root(), coarse_version)
    }

    /// Files an entry must contain to be ready, relative to the entry directory.
    pub fn required_files(&self) -> Vec<String> {
        TARGET_FILES
            .iter()
            .filter(|t| t.kind == TargetKind::ClientLibrary)
            .map(|t| t.name.to_string())
            .chain(std::iter::once(format!(
                "{COMPILER_DIR}/{}",
                self.platform.executable_name()
            )))
            .collect()
    }

    /// Read the completion marker of an entry, if present and well-formed.
    pub fn read_marker(&self, coarse_version: &str) -> Option<CompletionMarker> {
        let path = self.entry_path(coarse_version).join(MARKER_FILE);
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Whether the entry has a completion marker and every required file.
    pub fn is_ready(&self, coarse_version: &str) -> bool {
        if self.validate_version(coarse_version).is_err() || self.read_marker(coarse_version).is_none() {
            return false;
        }
        let dir = self.entry_path(coarse_version);
        self.required_files().iter().all(|f| dir.join(f).is_file())
    }

    /// Path of `file_name` inside a ready entry. The entry root is searched
    /// first, then the compiler subtree.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] if the entry is not ready, [`Error::FileNotFound`]
    /// if it does not contain the file.
    pub fn path_to(&self, coarse_version: &str, file_name: &str) -> Result<PathBuf> {
        if !self.is_ready(coarse_version) {
            return Err(Error::NotReady {
                version: coarse_version.to_string(),
            });
        }
        let not_found = || Error::FileNotFound {
            version: coarse_version.to_string(),
            file: file_name.to_string(),
        };

        let relative = Path::new(file_name);
        if file_name.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(not_found());
        }

        let dir = self.entry_path(coarse_version);
        [dir.join(relative), dir.join(COMPILER_DIR).join(relative)]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(not_found)
    }

    /// Return the entry directory for `coarse_version`, populating it first if
    /// needed. Safe to call concurrently from several tasks or processes: one
    /// populates, the others wait on the lock and then see the ready entry.
    ///
    /// # Errors
    ///
    /// Any resolution, network or archive error. The partially populated
    /// directory is removed before the error is returned.
    pub async fn ensure_ready(&self, coarse_version: &str, token: &CancellationToken) -> Result<PathBuf> {
        self.validate_version(coarse_version)?;
        let dir = self.entry_path(coarse_version);

        if self.is_ready(coarse_version) {
            debug!(coarse_version, "cache hit");
            return Ok(dir);
        }

        let _lock = self.lock(coarse_version, token).await?;

        if self.is_ready(coarse_version) {
            debug!(coarse_version, "populated by another worker");
            return Ok(dir);
        }

        if dir.exists() {
            warn!(path = %dir.display(), "removing incomplete cache entry");
            self.reporter
                .warning(&format!("Removing incomplete cache entry for {coarse_version}"));
            remove_entry(&dir).await?;
        }

        self.reporter.section(&format!("Populating {coarse_version}"));
        match self.populate(coarse_version, &dir, token).await {
            Ok(marker) => {
                info!(coarse_version, full_version = %marker.full_version, "cache entry ready");
                self.reporter.done(coarse_version, &marker.full_version, None);
                Ok(dir)
            }
            Err(e) => {
                warn!(coarse_version, error = %e, "population failed, removing entry");
                self.reporter.failed(coarse_version, &e.to_string());
                if let Err(cleanup) = remove_entry(&dir).await {
                    warn!(path = %dir.display(), error = %cleanup, "failed to remove partial entry");
                }
                Err(e)
            }
        }
    }

    /// Coarse versions double as directory names, so only digits and dots pass.
    fn validate_version(&self, version: &str) -> Result<()> {
        let valid = !version.is_empty()
            && version.chars().all(|c| c.is_ascii_digit() || c == '.')
            && !version.split('.').any(str::is_empty);
        if valid {
            Ok(())
        } else {
            Err(Error::NoMatchingRelease {
                channel: self.settings.channel.clone(),
                requested: version.to_string(),
            })
        }
    }

    async fn lock(&self, coarse_version: &str, token: &CancellationToken) -> Result<EntryLock> {
        let path = lock_path(self.root(), coarse_version);
        std::fs::create_dir_all(locks_dir(self.root()))?;

        debug!(path = %path.display(), "waiting for entry lock");
        let file = cancellable(
            token,
            blocking(move || {
                let file = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .write(true)
                    .truncate(false)
                    .open(&path)?;
                file.lock_exclusive()?;
                Ok(file)
            }),
        )
        .await?;
        Ok(EntryLock { _file: file })
    }

    async fn populate(
        &self,
        coarse_version: &str,
        dir: &Path,
        token: &CancellationToken,
    ) -> Result<CompletionMarker> {
        let full_version = self.index.resolve(coarse_version, token).await?;
        let url = self.settings.artifact_url(&full_version);
        self.reporter
            .info(&format!("Resolved {coarse_version} to {full_version}"));

        let remote = self.source.head(&url, token).await?;
        let tail = self
            .source
            .get_tail(&url, remote.total_size, EOCD_SEARCH_SIZE, token)
            .await?;
        let location = find_end_of_central_directory(&tail)?;
        if location.offset + location.size > remote.total_size {
            return Err(Error::CorruptArchive(format!(
                "central directory {}+{} lies past the end of a {} byte archive",
                location.offset, location.size, remote.total_size
            )));
        }

        let tail_start = remote.total_size - tail.len() as u64;
        let central_dir = if location.offset >= tail_start {
            let from = (location.offset - tail_start) as usize;
            tail.slice(from..from + location.size as usize)
        } else {
            let (start, end) = location.byte_range();
            self.source.get_range(&url, start, end, token).await?
        };

        let names: Vec<&str> = TARGET_FILES.iter().map(|t| t.name).collect();
        let directory = parse_central_directory(&central_dir, &names)?;
        if directory.record_count != usize::from(location.entry_count) {
            return Err(Error::CorruptArchive(format!(
                "central directory holds {} records, end record declares {}",
                directory.record_count, location.entry_count
            )));
        }
        let entries = directory.matches;
        debug!(
            entry_count = location.entry_count,
            matched = entries.len(),
            "parsed central directory"
        );

        tokio::fs::create_dir_all(dir).await?;

        for target in TARGET_FILES {
            let candidates: Vec<ArchiveEntryRef> = entries
                .iter()
                .filter(|e| e.file_name().eq_ignore_ascii_case(target.name))
                .cloned()
                .collect();
            let entry = select_best(&candidates, target.preferred_segment)
                .cloned()
                .ok_or_else(|| Error::EntryNotFound {
                    name: target.name.to_string(),
                })?;

            self.reporter
                .downloading(coarse_version, target.name, 0, Some(entry.compressed_size));
            let start = entry.local_header_offset;
            let end = (start + local_span(&entry)).min(remote.total_size) - 1;
            let data = self.source.get_range(&url, start, end, token).await?;
            self.reporter.downloading(
                coarse_version,
                target.name,
                entry.compressed_size,
                Some(entry.compressed_size),
            );

            let dest = dir.to_path_buf();
            let extracted = blocking(move || extract_entry(&data, &entry, &dest)).await?;

            if target.kind == TargetKind::InstallerArchive {
                self.reporter.extracting(coarse_version, target.name);
                let platform = self.platform;
                let compiler_dir = dir.join(COMPILER_DIR);
                let archive = extracted.clone();
                let count = blocking(move || {
                    extract_platform_subtree(&archive, platform, &compiler_dir)
                })
                .await?;
                tokio::fs::remove_file(&extracted).await?;
                debug!(count, "unpacked compiler");
            }
        }

        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let marker = CompletionMarker {
            coarse_version: coarse_version.to_string(),
            full_version,
            completed_at: Utc::now(),
            platform: self.platform,
            files: self.required_files(),
        };
        let marker_dir = dir.to_path_buf();
        let json = serde_json::to_vec_pretty(&marker)?;
        blocking(move || write_marker(&marker_dir, &json)).await?;
        Ok(marker)
    }

    /// Remove one entry, waiting for any population in progress.
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken or the directory cannot be removed.
    pub async fn remove(&self, coarse_version: &str, token: &CancellationToken) -> Result<bool> {
        self.validate_version(coarse_version)?;
        let dir = self.entry_path(coarse_version);
        let _lock = self.lock(coarse_version, token).await?;
        if !dir.exists() {
            return Ok(false);
        }
        remove_entry(&dir).await?;
        info!(coarse_version, "removed cache entry");
        Ok(true)
    }

    /// Remove every entry. Returns the versions removed.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that cannot be removed.
    pub async fn clear(&self, token: &CancellationToken) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for entry in self.list_entries()? {
            if self.remove(&entry.version, token).await? {
                removed.push(entry.version);
            }
        }
        Ok(removed)
    }

    /// Describe every entry directory under the cache root, sorted by version.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root exists but cannot be read.
    pub fn list_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        let root = self.root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in std::fs::read_dir(root)? {
            let item = item?;
            if !item.file_type()?.is_dir() {
                continue;
            }
            let Some(version) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.validate_version(&version).is_err() {
                continue;
            }

            let path = item.path();
            let size_bytes = walkdir::WalkDir::new(&path)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum();

            entries.push(CacheEntryInfo {
                ready: self.is_ready(&version),
                marker: self.read_marker(&version),
                version,
                path,
                size_bytes,
            });
        }

        entries.sort_by_key(|e| {
            let segments: Vec<u64> = e.version.split('.').filter_map(|s| s.parse().ok()).collect();
            (segments, e.version.clone())
        });
        Ok(entries)
    }
}

fn write_marker(dir: &Path, json: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(MARKER_FILE)).map_err(|e| e.error)?;
    Ok(())
}

async fn remove_entry(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::extract::tests::installer_archive;
    use crate::io::range::RemoteFile;
    use alkit_schema::ReleaseDescriptor;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use zip::CompressionMethod as ZipMethod;
    use zip::write::SimpleFileOptions;

    const TEST_CLIENT: &[u8] = b"client library from Test Assemblies";

    /// Serves an in-memory archive and counts requests.
    struct MemorySource {
        data: Bytes,
        heads: AtomicUsize,
        ranges: AtomicUsize,
        /// Cancel this token while serving the given range request number.
        trip: Option<(usize, CancellationToken)>,
    }

    impl MemorySource {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data: Bytes::from(data),
                heads: AtomicUsize::new(0),
                ranges: AtomicUsize::new(0),
                trip: None,
            }
        }
    }

    #[async_trait]
    impl RangeSource for MemorySource {
        async fn head(&self, _url: &str, token: &CancellationToken) -> Result<RemoteFile> {
            self.heads.fetch_add(1, Ordering::SeqCst);
            cancellable(token, async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(RemoteFile {
                    total_size: self.data.len() as u64,
                    supports_ranges: true,
                })
            })
            .await
        }

        async fn get_range(
            &self,
            _url: &str,
            start: u64,
            end_inclusive: u64,
            token: &CancellationToken,
        ) -> Result<Bytes> {
            let n = self.ranges.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((at, trip)) = &self.trip {
                if *at == n {
                    trip.cancel();
                }
            }
            cancellable(token, async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(self.data.slice(start as usize..=end_inclusive as usize))
            })
            .await
        }
    }

    fn platform_archive(include_installer: bool) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let stored = SimpleFileOptions::default().compression_method(ZipMethod::Stored);
            let deflated = SimpleFileOptions::default().compression_method(ZipMethod::Deflated);

            zip.add_directory("ServiceTier/", stored).unwrap();
            zip.start_file(
                "ServiceTier/program files/Microsoft Dynamics NAV/270/Service/Microsoft.Dynamics.Framework.UI.Client.dll",
                deflated,
            )
            .unwrap();
            zip.write_all(&b"service tier copy ".repeat(100)).unwrap();
            zip.start_file("Test Assemblies/Microsoft.Dynamics.Framework.UI.Client.dll", stored)
                .unwrap();
            zip.write_all(TEST_CLIENT).unwrap();
            zip.start_file("Test Assemblies/Newtonsoft.Json.dll", deflated)
                .unwrap();
            zip.write_all(&b"json ".repeat(200)).unwrap();
            zip.start_file("Applications/BaseApp/Source/Base Application.app", deflated)
                .unwrap();
            zip.write_all(&[7u8; 4096]).unwrap();
            if include_installer {
                zip.start_file(
                    "ModernDev/program files/Microsoft Dynamics NAV/270/AL Development Environment/ALLanguage.vsix",
                    stored,
                )
                .unwrap();
                zip.write_all(&installer_archive()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn releases() -> Vec<ReleaseDescriptor> {
        serde_json::from_str(
            r#"[{"Version":"27.0.38460.40483","CreationTime":"2025-10-20T00:00:00Z"}]"#,
        )
        .unwrap()
    }

    fn cache_with(root: &Path, source: Arc<MemorySource>) -> ArtifactCache {
        let settings = Settings {
            cdn_url: "mem://cdn".to_string(),
            cache_root: root.to_path_buf(),
            ..Settings::default()
        };
        let index = Arc::new(VersionIndex::with_releases("sandbox", releases()));
        ArtifactCache::with_parts(settings, index, source).with_platform(Platform::Linux)
    }

    #[tokio::test]
    async fn test_populate_and_query() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(MemorySource::new(platform_archive(true)));
        let cache = cache_with(tmp.path(), source.clone());
        let token = CancellationToken::new();

        assert!(!cache.is_ready("27.0"));
        let dir = cache.ensure_ready("27.0", &token).await.unwrap();
        assert_eq!(dir, tmp.path().join("27.0"));
        assert!(cache.is_ready("27.0"));

        // Preferred copy, not the longer service tier path.
        let client = cache
            .path_to("27.0", "Microsoft.Dynamics.Framework.UI.Client.dll")
            .unwrap();
        assert_eq!(std::fs::read(client).unwrap(), TEST_CLIENT);
        assert_eq!(
            std::fs::read(cache.path_to("27.0", "Newtonsoft.Json.dll").unwrap()).unwrap(),
            b"json ".repeat(200)
        );
        assert_eq!(
            cache.path_to("27.0", "alc").unwrap(),
            dir.join("compiler").join("alc")
        );
        assert!(dir.join("compiler/lib/runtime.dll").is_file());
        assert!(!dir.join("ALLanguage.vsix").exists());

        let marker = cache.read_marker("27.0").unwrap();
        assert_eq!(marker.full_version, "27.0.38460.40483");
        assert_eq!(marker.files, cache.required_files());

        // Second call is served from disk.
        cache.ensure_ready("27.0", &token).await.unwrap();
        assert_eq!(source.heads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_path_to_errors() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(MemorySource::new(platform_archive(true)));
        let cache = cache_with(tmp.path(), source);

        assert!(matches!(
            cache.path_to("27.0", "alc"),
            Err(Error::NotReady { .. })
        ));
        cache
            .ensure_ready("27.0", &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(
            cache.path_to("27.0", "missing.dll"),
            Err(Error::FileNotFound { .. })
        ));
        assert!(matches!(
            cache.path_to("27.0", "../27.0/Newtonsoft.Json.dll"),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_populate_once() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(MemorySource::new(platform_archive(true)));
        let cache = Arc::new(cache_with(tmp.path(), source.clone()));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .ensure_ready("27.0", &CancellationToken::new())
                        .await
                })
            })
            .collect();

        for handle in handles {
            let dir = handle.await.unwrap().unwrap();
            assert!(dir.join(MARKER_FILE).is_file());
        }
        assert_eq!(source.heads.load(Ordering::SeqCst), 1);
        assert!(cache.is_ready("27.0"));
    }

    #[tokio::test]
    async fn test_entry_without_marker_is_repopulated() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(MemorySource::new(platform_archive(true)));
        let cache = cache_with(tmp.path(), source.clone());
        let token = CancellationToken::new();

        // Leftovers of an interrupted population: files but no marker.
        let dir = cache.entry_path("27.0");
        std::fs::create_dir_all(dir.join("compiler")).unwrap();
        for f in cache.required_files() {
            std::fs::write(dir.join(f), b"partial").unwrap();
        }
        std::fs::write(dir.join("junk.tmp"), b"x").unwrap();
        assert!(!cache.is_ready("27.0"));

        cache.ensure_ready("27.0", &token).await.unwrap();
        assert!(cache.is_ready("27.0"));
        assert!(!dir.join("junk.tmp").exists());
        assert_eq!(source.heads.load(Ordering::SeqCst), 1);

        // Directory removed behind the cache's back.
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(!cache.is_ready("27.0"));
        cache.ensure_ready("27.0", &token).await.unwrap();
        assert_eq!(source.heads.load(Ordering::SeqCst), 2);

        // A required file vanishing also invalidates the entry.
        std::fs::remove_file(dir.join("Newtonsoft.Json.dll")).unwrap();
        assert!(!cache.is_ready("27.0"));
    }

    #[tokio::test]
    async fn test_missing_target_removes_entry() {
        let tmp = TempDir::new().unwrap();
        let source = Arc::new(MemorySource::new(platform_archive(false)));
        let cache = cache_with(tmp.path(), source);

        let err = cache
            .ensure_ready("27.0", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { ref name } if name == "ALLanguage.vsix"));
        assert!(!cache.entry_path("27.0").exists());
    }

    #[tokio::test]
    async fn test_entry_count_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let mut archive = platform_archive(true);
        // The writer adds no comment, so the end record is the last 22 bytes.
        let count_at = archive.len() - 22 + 10;
        let declared = u16::from_le_bytes([archive[count_at], archive[count_at + 1]]);
        archive[count_at..count_at + 2].copy_from_slice(&(declared + 1).to_le_bytes());
        let cache = cache_with(tmp.path(), Arc::new(MemorySource::new(archive)));

        let err = cache
            .ensure_ready("27.0", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(ref msg) if msg.contains("records")));
        assert!(!cache.entry_path("27.0").exists());
    }

    #[tokio::test]
    async fn test_cancelled_population_removes_entry() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let mut source = MemorySource::new(platform_archive(true));
        // Request 1 is the tail (the directory fits in it), 2 and 3 the client libraries.
        source.trip = Some((3, token.clone()));
        let cache = cache_with(tmp.path(), Arc::new(source));

        let err = cache.ensure_ready("27.0", &token).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!cache.entry_path("27.0").exists());
    }

    #[tokio::test]
    async fn test_unknown_release() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_with(tmp.path(), Arc::new(MemorySource::new(platform_archive(true))));
        let err = cache
            .ensure_ready("28.0", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoMatchingRelease { .. }));
        assert!(matches!(
            cache.ensure_ready("../etc", &CancellationToken::new()).await,
            Err(Error::NoMatchingRelease { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_with(tmp.path(), Arc::new(MemorySource::new(platform_archive(true))));
        let token = CancellationToken::new();

        cache.ensure_ready("27.0", &token).await.unwrap();
        std::fs::create_dir_all(cache.entry_path("26.5")).unwrap();

        let entries = cache.list_entries().unwrap();
        let versions: Vec<_> = entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["26.5", "27.0"]);
        assert!(!entries[0].ready);
        assert!(entries[1].ready);
        assert!(entries[1].size_bytes > 0);

        assert!(cache.remove("27.0", &token).await.unwrap());
        assert!(!cache.remove("27.0", &token).await.unwrap());
        assert_eq!(cache.clear(&token).await.unwrap(), vec!["26.5".to_string()]);
        assert!(cache.list_entries().unwrap().is_empty());
    }
}
