//! Extraction of entries pulled out of a remote archive by byte range, and of
//! the compiler subtree from the nested installer archive.
//!
//! Everything in here is synchronous; async callers run it through
//! `spawn_blocking`.

use crate::error::{Error, Result};
use alkit_schema::{ArchiveEntryRef, CompressionMethod, Platform, base_name};
use flate2::read::DeflateDecoder;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Fixed part of a local file header.
pub const LOCAL_HEADER_MIN_SIZE: u64 = 30;

/// Extra bytes fetched past the payload to cover the local header's extra
/// field, whose length the Central Directory does not record.
pub const LOCAL_HEADER_SLACK: u64 = 64 * 1024;

/// What a target file in the outer archive is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A client library copied into the cache entry as-is.
    ClientLibrary,
    /// The installer archive the compiler subtree is unpacked from.
    InstallerArchive,
}

/// A file pulled out of the outer distribution archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFile {
    /// Base file name to look for.
    pub name: &'static str,
    pub kind: TargetKind,
    /// Path segment that marks the preferred copy when the name occurs more than once.
    pub preferred_segment: &'static str,
}

/// Everything a cache entry is populated from.
pub const TARGET_FILES: &[TargetFile] = &[
    TargetFile {
        name: "Microsoft.Dynamics.Framework.UI.Client.dll",
        kind: TargetKind::ClientLibrary,
        preferred_segment: "Test Assemblies",
    },
    TargetFile {
        name: "Newtonsoft.Json.dll",
        kind: TargetKind::ClientLibrary,
        preferred_segment: "Test Assemblies",
    },
    TargetFile {
        name: "ALLanguage.vsix",
        kind: TargetKind::InstallerArchive,
        preferred_segment: "AL Development Environment",
    },
];

fn has_segment(path: &str, segment: &str) -> bool {
    path.split(['/', '\\']).any(|s| s.eq_ignore_ascii_case(segment))
}

/// Pick one entry out of several with the same file name.
///
/// Entries under `preferred_segment` win; otherwise, or among several preferred
/// entries, the shortest internal path wins and ties go to the lexicographically
/// smaller path. The result does not depend on candidate order.
pub fn select_best<'a>(
    candidates: &'a [ArchiveEntryRef],
    preferred_segment: &str,
) -> Option<&'a ArchiveEntryRef> {
    let rank = |e: &ArchiveEntryRef| {
        (
            !has_segment(&e.internal_path, preferred_segment),
            e.internal_path.len(),
            e.internal_path.clone(),
        )
    };
    let best = candidates.iter().min_by_key(|e| rank(e));
    if let Some(entry) = best {
        debug!(
            path = %entry.internal_path,
            candidates = candidates.len(),
            "selected archive entry"
        );
    }
    best
}

/// How many bytes starting at the local header cover the whole entry.
pub fn local_span(entry: &ArchiveEntryRef) -> u64 {
    LOCAL_HEADER_MIN_SIZE
        + entry.internal_path.len() as u64
        + entry.compressed_size
        + LOCAL_HEADER_SLACK
}

/// Decode an entry from bytes starting at its local file header and write it
/// to `dest_dir/<base file name>`.
///
/// # Errors
///
/// [`Error::UnsupportedCompressionMethod`] for anything but Store and Deflate,
/// [`Error::CorruptArchive`] if the header is malformed, the payload is cut
/// short, or the decoded size differs from the Central Directory.
pub fn extract_entry(data: &[u8], entry: &ArchiveEntryRef, dest_dir: &Path) -> Result<PathBuf> {
    if let CompressionMethod::Other(method) = entry.compression_method {
        return Err(Error::UnsupportedCompressionMethod {
            entry: entry.internal_path.clone(),
            method,
        });
    }

    let header_len = LOCAL_HEADER_MIN_SIZE as usize;
    if data.len() < header_len || data[..4] != LOCAL_HEADER_SIGNATURE {
        return Err(Error::CorruptArchive(format!(
            "bad local header for {}",
            entry.internal_path
        )));
    }
    let name_len = usize::from(u16::from_le_bytes([data[26], data[27]]));
    let extra_len = usize::from(u16::from_le_bytes([data[28], data[29]]));
    let payload_start = header_len + name_len + extra_len;
    let payload_end = usize::try_from(entry.compressed_size)
        .ok()
        .and_then(|size| payload_start.checked_add(size))
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            Error::CorruptArchive(format!("payload of {} is truncated", entry.internal_path))
        })?;
    let payload = &data[payload_start..payload_end];

    let content = match entry.compression_method {
        CompressionMethod::Deflate => {
            let mut decoder = DeflateDecoder::new(payload);
            let mut decompressed = Vec::with_capacity(entry.uncompressed_size as usize);
            decoder.read_to_end(&mut decompressed).map_err(|e| {
                Error::CorruptArchive(format!("inflate of {} failed: {e}", entry.internal_path))
            })?;
            decompressed
        }
        _ => payload.to_vec(),
    };

    if content.len() as u64 != entry.uncompressed_size {
        return Err(Error::CorruptArchive(format!(
            "{} decoded to {} bytes, expected {}",
            entry.internal_path,
            content.len(),
            entry.uncompressed_size
        )));
    }

    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(base_name(&entry.internal_path));
    let mut tmp = tempfile::NamedTempFile::new_in(dest_dir)?;
    tmp.write_all(&content)?;
    tmp.persist(&dest).map_err(|e| e.error)?;

    debug!(path = %dest.display(), bytes = content.len(), "extracted entry");
    Ok(dest)
}

/// Unpack `extension/bin/<platform>/` from the installer archive into
/// `dest_dir`, keeping paths relative to that prefix. Returns the number of
/// files written.
///
/// # Errors
///
/// [`Error::ExecutableNotFoundInArchive`] if the compiler for `platform` was
/// not among the extracted files.
pub fn extract_platform_subtree(
    archive_path: &Path,
    platform: Platform,
    dest_dir: &Path,
) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let prefix = PathBuf::from(platform.archive_prefix());

    std::fs::create_dir_all(dest_dir)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        // enclosed_name() rejects absolute paths and `..` traversal.
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        let Ok(relative) = path.strip_prefix(&prefix) else {
            continue;
        };

        let out_path = dest_dir.join(relative);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        count += 1;
    }

    let executable = dest_dir.join(platform.executable_name());
    if !executable.is_file() {
        return Err(Error::ExecutableNotFoundInArchive {
            executable: platform.executable_name().to_string(),
            prefix: platform.archive_prefix(),
            archive: archive_path.display().to_string(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&executable)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&executable, perms)?;
    }

    debug!(count, platform = %platform, "extracted compiler subtree");
    Ok(count)
}
