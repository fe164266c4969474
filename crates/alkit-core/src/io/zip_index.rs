//! Minimal ZIP index reading for remote archives.
//!
//! Only the two structures needed to locate entries are understood: the End of
//! Central Directory record and Central Directory file headers. ZIP64 is
//! rejected.

use crate::error::{Error, Result};
use alkit_schema::{ArchiveEntryRef, CompressionMethod, base_name};
use tracing::debug;

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CENTRAL_DIR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];

/// Fixed part of the EOCD record.
pub const EOCD_MIN_SIZE: usize = 22;
/// Fixed part of a Central Directory file header.
pub const CENTRAL_DIR_ENTRY_MIN_SIZE: usize = 46;
/// The EOCD sits within the last 64 KiB (max comment length plus the record).
pub const EOCD_SEARCH_SIZE: u64 = 64 * 1024;

const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;
const ZIP64_MARKER_16: u16 = 0xFFFF;

/// Where the Central Directory lives, as recorded in the EOCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryLocation {
    /// Absolute offset of the first Central Directory record.
    pub offset: u64,
    /// Size of the Central Directory in bytes.
    pub size: u64,
    /// Total number of entries in the archive.
    pub entry_count: u16,
}

impl CentralDirectoryLocation {
    /// Inclusive byte range covering the Central Directory.
    pub fn byte_range(&self) -> (u64, u64) {
        (self.offset, self.offset + self.size.max(1) - 1)
    }
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Locate the EOCD record in the tail of an archive.
///
/// Candidates are tried from the end backward. A candidate is accepted only if
/// its comment length reaches exactly to the end of `tail`, so signature bytes
/// inside an archive comment are skipped.
///
/// # Errors
///
/// [`Error::CorruptArchive`] if no complete record is found,
/// [`Error::Zip64NotSupported`] if any field holds a ZIP64 marker.
pub fn find_end_of_central_directory(tail: &[u8]) -> Result<CentralDirectoryLocation> {
    let eocd_offset = (0..=tail.len().saturating_sub(EOCD_MIN_SIZE))
        .rev()
        .filter(|&pos| pos + EOCD_MIN_SIZE <= tail.len())
        .find(|&pos| {
            tail[pos..pos + 4] == EOCD_SIGNATURE
                && pos + EOCD_MIN_SIZE + usize::from(read_u16(tail, pos + 20)) == tail.len()
        })
        .ok_or_else(|| {
            Error::CorruptArchive("could not find End of Central Directory record".to_string())
        })?;

    let eocd = &tail[eocd_offset..];
    let entry_count = read_u16(eocd, 10);
    let size = read_u32(eocd, 12);
    let offset = read_u32(eocd, 16);

    if offset == ZIP64_MARKER_32 || size == ZIP64_MARKER_32 || entry_count == ZIP64_MARKER_16 {
        return Err(Error::Zip64NotSupported);
    }

    let location = CentralDirectoryLocation {
        offset: u64::from(offset),
        size: u64::from(size),
        entry_count,
    };
    debug!(?location, "found EOCD");
    Ok(location)
}

/// Entries of interest out of a Central Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectory {
    /// Entries matching the requested names, in archive order.
    pub matches: Vec<ArchiveEntryRef>,
    /// Number of records walked, matched or not.
    pub record_count: usize,
}

/// Walk Central Directory records and return every entry whose base file name
/// matches one of `target_names` (ASCII case-insensitive), together with the
/// total number of records.
///
/// Several entries may match the same name; all are returned in archive order.
/// Directory entries are ignored.
///
/// # Errors
///
/// [`Error::CorruptArchive`] if a record is truncated or the signature is
/// wrong, [`Error::Zip64NotSupported`] for a matched entry with ZIP64 sizes.
pub fn parse_central_directory(bytes: &[u8], target_names: &[&str]) -> Result<CentralDirectory> {
    let mut matches = Vec::new();
    let mut record_count = 0;
    let mut offset = 0;

    while offset < bytes.len() {
        if offset + CENTRAL_DIR_ENTRY_MIN_SIZE > bytes.len() {
            return Err(Error::CorruptArchive(format!(
                "truncated central directory record at offset {offset}"
            )));
        }
        let record = &bytes[offset..];
        if record[..4] != CENTRAL_DIR_SIGNATURE {
            return Err(Error::CorruptArchive(format!(
                "bad central directory signature at offset {offset}"
            )));
        }

        let method = read_u16(record, 10);
        let compressed_size = read_u32(record, 20);
        let uncompressed_size = read_u32(record, 24);
        let name_len = usize::from(read_u16(record, 28));
        let extra_len = usize::from(read_u16(record, 30));
        let comment_len = usize::from(read_u16(record, 32));
        let local_header_offset = read_u32(record, 42);

        let record_len = CENTRAL_DIR_ENTRY_MIN_SIZE + name_len + extra_len + comment_len;
        if record_len > record.len() {
            return Err(Error::CorruptArchive(format!(
                "central directory record at offset {offset} runs past the end"
            )));
        }

        let name_bytes = &record[CENTRAL_DIR_ENTRY_MIN_SIZE..CENTRAL_DIR_ENTRY_MIN_SIZE + name_len];
        let internal_path = String::from_utf8_lossy(name_bytes).into_owned();

        let is_dir = internal_path.ends_with('/');
        let file_name = base_name(&internal_path);
        if !is_dir && target_names.iter().any(|t| t.eq_ignore_ascii_case(file_name)) {
            if compressed_size == ZIP64_MARKER_32
                || uncompressed_size == ZIP64_MARKER_32
                || local_header_offset == ZIP64_MARKER_32
            {
                return Err(Error::Zip64NotSupported);
            }
            debug!(path = %internal_path, method, compressed_size, "matched entry");
            matches.push(ArchiveEntryRef {
                internal_path,
                compression_method: CompressionMethod::from_code(method),
                compressed_size: u64::from(compressed_size),
                uncompressed_size: u64::from(uncompressed_size),
                local_header_offset: u64::from(local_header_offset),
            });
        }

        offset += record_len;
        record_count += 1;
    }

    Ok(CentralDirectory {
        matches,
        record_count,
    })
}
