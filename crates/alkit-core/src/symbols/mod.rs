//! Symbol package resolution: which packages an application compiles against,
//! which feed and version satisfy each, and fetching their payloads.

pub mod download;
pub mod feed;
pub mod resolver;

pub use download::{DownloadedSymbol, SymbolReport, download_all};
pub use feed::NuGetFeedClient;
pub use resolver::{BASE_APPLICATION_ID, ResolvedPackage, SymbolResolver, symbols_for};
