//! Core data types shared by the engine and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One published platform release, as listed by the remote release index.
///
/// Field names on the wire are `PascalCase` and fixed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Full version string (e.g. "27.0.38460.40483").
    #[serde(rename = "Version")]
    pub version: String,

    /// When the release was published.
    #[serde(rename = "CreationTime")]
    pub published_at: DateTime<Utc>,
}

/// Compression method of a ZIP entry.
///
/// Only [`Store`](Self::Store) and [`Deflate`](Self::Deflate) can be
/// extracted; anything else is kept verbatim so it can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// Method 0, no compression.
    Store,
    /// Method 8, raw DEFLATE.
    Deflate,
    /// Any other method code.
    Other(u16),
}

impl CompressionMethod {
    /// Map a raw ZIP method code.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Store,
            8 => Self::Deflate,
            other => Self::Other(other),
        }
    }

    /// The raw ZIP method code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Store => 0,
            Self::Deflate => 8,
            Self::Other(code) => *code,
        }
    }
}

/// A Central Directory record matched against a target file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveEntryRef {
    /// Full path of the entry inside the archive, `/`-separated.
    pub internal_path: String,
    /// How the payload is compressed.
    pub compression_method: CompressionMethod,
    /// Size of the payload as stored.
    pub compressed_size: u64,
    /// Size of the payload once decompressed.
    pub uncompressed_size: u64,
    /// Absolute offset of the entry's local file header.
    pub local_header_offset: u64,
}

impl ArchiveEntryRef {
    /// Base file name of the entry, with the internal directory path dropped.
    pub fn file_name(&self) -> &str {
        base_name(&self.internal_path)
    }
}

/// Last path component of an archive path, accepting either separator.
pub fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

/// A dependency package that must be fetched before compiling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRequest {
    /// Publisher of the application (e.g. "Microsoft").
    pub publisher: String,
    /// Application name (e.g. "Base Application").
    pub name: String,
    /// Requested (minimum) version.
    pub version: String,
    /// Application GUID, used by the package naming templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Explicit package id; when set it is the only id tried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
}

impl SymbolRequest {
    /// Create a request without an app id or explicit package id.
    pub fn new(
        publisher: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            name: name.into(),
            version: version.into(),
            app_id: None,
            package_id: None,
        }
    }

    /// Attach the application GUID.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Whether this request names the same application as `other`.
    ///
    /// Identity is the (publisher, name) pair, compared case-insensitively.
    pub fn same_identity(&self, other: &Self) -> bool {
        self.publisher.eq_ignore_ascii_case(&other.publisher)
            && self.name.eq_ignore_ascii_case(&other.name)
    }

    /// File name the downloaded payload is stored under.
    ///
    /// Manifest and feed values are untrusted, so path separators and other
    /// characters that are not valid in a file name are replaced with `_`. The
    /// result is always a single path component.
    pub fn payload_file_name(&self, resolved_version: &str) -> String {
        format!(
            "{}_{}_{}{}",
            file_name_part(&self.publisher),
            file_name_part(&self.name),
            file_name_part(resolved_version),
            crate::PAYLOAD_EXTENSION
        )
    }
}

fn file_name_part(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

impl std::fmt::Display for SymbolRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.publisher, self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_descriptor_pascal_case() {
        let json = r#"[{"Version":"27.0.38460.40483","CreationTime":"2025-10-01T08:15:00Z"}]"#;
        let releases: Vec<ReleaseDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(releases[0].version, "27.0.38460.40483");
        assert_eq!(releases[0].published_at.to_rfc3339(), "2025-10-01T08:15:00+00:00");
    }

    #[test]
    fn test_base_name_ignores_directories() {
        assert_eq!(base_name("Test Assemblies/Newtonsoft.Json.dll"), "Newtonsoft.Json.dll");
        assert_eq!(base_name("a\\b\\c.dll"), "c.dll");
        assert_eq!(base_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_compression_codes() {
        assert_eq!(CompressionMethod::from_code(0), CompressionMethod::Store);
        assert_eq!(CompressionMethod::from_code(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_code(14).code(), 14);
    }

    #[test]
    fn test_same_identity_is_case_insensitive() {
        let a = SymbolRequest::new("Microsoft", "System Application", "27.0.0.0");
        let b = SymbolRequest::new("microsoft", "system application", "26.0.0.0");
        assert!(a.same_identity(&b));
    }

    #[test]
    fn test_payload_file_name() {
        let req = SymbolRequest::new("Microsoft", "Base Application", "27.0.0.0");
        assert_eq!(
            req.payload_file_name("27.0.38460.40483"),
            "Microsoft_Base Application_27.0.38460.40483.app"
        );
    }

    #[test]
    fn test_payload_file_name_stays_one_component() {
        let req = SymbolRequest::new("../", "Evil", "1.0.0.0");
        let name = req.payload_file_name("1.0.0");
        assert_eq!(name, "..__Evil_1.0.0.app");
        assert!(!name.contains('/'));

        let req = SymbolRequest::new("Fabrikam", "..\\..\\tools", "1.0.0.0");
        let name = req.payload_file_name("../2.0");
        assert!(!name.contains('/') && !name.contains('\\'));
        assert_eq!(
            std::path::Path::new(&name).components().count(),
            1,
            "{name} must be a single path component"
        );
    }
}
