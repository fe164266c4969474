//! Artifact acquisition and caching engine.
//!
//! Resolves platform versions against the release index, pulls the handful of
//! files a build needs out of the multi-gigabyte distribution archive with HTTP
//! range requests, caches them per version, and fetches symbol packages from
//! NuGet feeds.

pub mod cache;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod release_index;
pub mod reporter;
pub mod symbols;

pub use cache::{ArtifactCache, CacheEntryInfo, CompletionMarker};
pub use config::Settings;
pub use error::{Error, ErrorKind, Failure, Result};
pub use paths::*;
pub use release_index::VersionIndex;
pub use reporter::{NullReporter, Reporter};
pub use symbols::{SymbolReport, SymbolResolver};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("alkit-core/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every network component.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}
