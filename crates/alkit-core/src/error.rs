//! Error taxonomy for artifact acquisition and symbol resolution.
//!
//! Every fallible operation in this crate returns [`Error`]. Callers that need
//! a machine-readable cause (the CLI's JSON output, batch reports) go through
//! [`Error::kind`] and [`Failure`].

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Release index unavailable at {url}: {message}")]
    IndexUnavailable { url: String, message: String },

    #[error("No release in channel '{channel}' matches version {requested}")]
    NoMatchingRelease { channel: String, requested: String },

    #[error("Server does not support range requests for {url}: {reason}")]
    RangeUnsupported { url: String, reason: String },

    #[error("Expected 206 Partial Content from {url}, got HTTP {status}")]
    UnexpectedRangeResponse { url: String, status: u16 },

    #[error("ZIP64 archives are not supported")]
    Zip64NotSupported,

    #[error("Unsupported compression method {method} for {entry}")]
    UnsupportedCompressionMethod { entry: String, method: u16 },

    #[error("Executable '{executable}' not found under '{prefix}' in {archive}")]
    ExecutableNotFoundInArchive {
        executable: String,
        prefix: String,
        archive: String,
    },

    #[error(
        "No version of {package_id} compatible with {requested}. \
         Available in {requested} major.minor: [{}]. All available: [{}]",
        same_minor.join(", "),
        available.join(", ")
    )]
    NoCompatibleVersion {
        package_id: String,
        requested: String,
        same_minor: Vec<String>,
        available: Vec<String>,
    },

    #[error("No '{extension}' payload found in package {package_id} {version}")]
    PayloadNotFoundInPackage {
        package_id: String,
        version: String,
        extension: String,
    },

    #[error("Package {package_id} {version} contains more than one payload: {}", entries.join(", "))]
    AmbiguousPayload {
        package_id: String,
        version: String,
        entries: Vec<String>,
    },

    #[error("Feed request to {url} failed: {message}")]
    FeedNetworkError { url: String, message: String },

    #[error("No package found for {subject} in any feed (tried {})", tried.join(", "))]
    PackageNotFound { subject: String, tried: Vec<String> },

    #[error("'{name}' is not a plain file name")]
    InvalidFileName { name: String },

    #[error("'{name}' not found in archive")]
    EntryNotFound { name: String },

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Cache entry for {version} is not ready")]
    NotReady { version: String },

    #[error("'{file}' not found in cache entry for {version}")]
    FileNotFound { version: String, file: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable cause of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IndexUnavailable,
    NoMatchingRelease,
    RangeUnsupported,
    UnexpectedRangeResponse,
    Zip64NotSupported,
    UnsupportedCompressionMethod,
    ExecutableNotFoundInArchive,
    NoCompatibleVersion,
    PayloadNotFoundInPackage,
    AmbiguousPayload,
    FeedNetworkError,
    Network,
    InvalidFileName,
    PackageNotFound,
    EntryNotFound,
    CorruptArchive,
    NotReady,
    FileNotFound,
    Cancelled,
    Io,
}

impl Error {
    /// The machine-readable cause of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexUnavailable { .. } => ErrorKind::IndexUnavailable,
            Self::NoMatchingRelease { .. } => ErrorKind::NoMatchingRelease,
            Self::RangeUnsupported { .. } => ErrorKind::RangeUnsupported,
            Self::UnexpectedRangeResponse { .. } => ErrorKind::UnexpectedRangeResponse,
            Self::Zip64NotSupported => ErrorKind::Zip64NotSupported,
            Self::UnsupportedCompressionMethod { .. } => ErrorKind::UnsupportedCompressionMethod,
            Self::ExecutableNotFoundInArchive { .. } => ErrorKind::ExecutableNotFoundInArchive,
            Self::NoCompatibleVersion { .. } => ErrorKind::NoCompatibleVersion,
            Self::PayloadNotFoundInPackage { .. } => ErrorKind::PayloadNotFoundInPackage,
            Self::AmbiguousPayload { .. } => ErrorKind::AmbiguousPayload,
            Self::FeedNetworkError { .. } => ErrorKind::FeedNetworkError,
            Self::Http(_) => ErrorKind::Network,
            Self::InvalidFileName { .. } => ErrorKind::InvalidFileName,
            Self::PackageNotFound { .. } => ErrorKind::PackageNotFound,
            Self::EntryNotFound { .. } => ErrorKind::EntryNotFound,
            Self::CorruptArchive(_) | Self::Zip(_) | Self::Json(_) => ErrorKind::CorruptArchive,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap a transport error raised while talking to a package feed.
    pub(crate) fn feed(url: &str, err: impl std::fmt::Display) -> Self {
        Self::FeedNetworkError {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// A structured failure, as reported across the CLI boundary.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// What failed (a version, a package, a file).
    pub subject: String,
    /// Machine-readable cause.
    pub kind: ErrorKind,
    /// Human-readable message, including any candidate lists.
    pub message: String,
}

impl Failure {
    /// Describe `err` as a failure of `subject`.
    pub fn new(subject: impl Into<String>, err: &Error) -> Self {
        Self {
            subject: subject.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_compatible_version_lists_candidates() {
        let err = Error::NoCompatibleVersion {
            package_id: "microsoft.platform.symbols".into(),
            requested: "27.0.6".into(),
            same_minor: vec!["27.0.5".into()],
            available: vec!["26.5.1".into(), "27.0.5".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("[27.0.5]"));
        assert!(msg.contains("[26.5.1, 27.0.5]"));
        assert_eq!(err.kind(), ErrorKind::NoCompatibleVersion);
    }

    #[test]
    fn test_failure_serializes_kind() {
        let failure = Failure::new("27.0", &Error::Zip64NotSupported);
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"zip64_not_supported\""));
    }

    #[test]
    fn test_feed_and_transport_errors_have_distinct_kinds() {
        let feed = Error::feed("https://feed.example/x/index.json", "HTTP 500");
        assert_eq!(feed.kind(), ErrorKind::FeedNetworkError);
        let json = serde_json::to_string(&ErrorKind::Network).unwrap();
        assert_eq!(json, "\"network\"");
    }
}
