//! Shared, I/O-free types for alkit.
//!
//! Everything in here is pure data and pure functions: release descriptors,
//! archive entry references, version parsing and matching, platform detection,
//! the application manifest model and the symbol package naming rules. The
//! engine (`alkit-core`) and the CLI both build on these.

pub mod manifest;
pub mod package_id;
pub mod platform;
pub mod types;
pub mod version;

// Re-exports
pub use manifest::{AppManifest, Dependency, ManifestError};
pub use package_id::{Country, package_ids};
pub use platform::Platform;
pub use types::*;
pub use version::{VersionParts, find_compatible_version, parse_version_parts};

/// File extension of a symbol payload inside a symbol package.
pub const PAYLOAD_EXTENSION: &str = ".app";
