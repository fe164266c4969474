//! Working out which symbol packages an application needs, and where they live.

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::symbols::feed::NuGetFeedClient;
use alkit_schema::version::same_minor_versions;
use alkit_schema::{AppManifest, Country, SymbolRequest, find_compatible_version, package_ids};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MICROSOFT: &str = "Microsoft";

/// Application id of the Base Application, fixed across releases.
pub const BASE_APPLICATION_ID: &str = "437dbf0e-84ff-417a-965d-ed2bb9650972";

/// Symbol requests for an application, in resolution order.
///
/// The implicit platform packages come first: Application and Base Application
/// at the manifest's `application` version, System at its `platform` version.
/// Declared dependencies follow unless one with the same publisher and name is
/// already present. An implicit request is skipped when the manifest omits the
/// version it would use.
pub fn symbols_for(manifest: &AppManifest) -> Vec<SymbolRequest> {
    let mut requests: Vec<SymbolRequest> = Vec::new();

    if let Some(application) = &manifest.application {
        requests.push(SymbolRequest::new(MICROSOFT, "Application", application));
    }
    if let Some(platform) = &manifest.platform {
        requests.push(SymbolRequest::new(MICROSOFT, "System", platform));
    }
    if let Some(application) = &manifest.application {
        requests.push(
            SymbolRequest::new(MICROSOFT, "Base Application", application)
                .with_app_id(BASE_APPLICATION_ID),
        );
    }
    if manifest.application.is_none() || manifest.platform.is_none() {
        debug!(app = %manifest.name, "manifest omits platform or application version");
    }

    for dep in &manifest.dependencies {
        let mut request = SymbolRequest::new(&dep.publisher, &dep.name, &dep.version);
        request.app_id = dep.id.clone();
        if requests.iter().any(|r| r.same_identity(&request)) {
            debug!(dependency = %request, "already requested");
            continue;
        }
        requests.push(request);
    }

    requests
}

/// Where a request was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    /// Name of the feed that had the package.
    pub feed: String,
    pub feed_url: String,
    pub package_id: String,
    /// Version selected for download.
    pub version: String,
}

/// Resolves symbol requests against the configured feeds.
pub struct SymbolResolver {
    client: NuGetFeedClient,
    feeds: Vec<FeedConfig>,
    country: Country,
}

impl SymbolResolver {
    pub fn new(client: reqwest::Client, feeds: Vec<FeedConfig>, country: Country) -> Self {
        Self {
            client: NuGetFeedClient::new(client),
            feeds,
            country,
        }
    }

    /// Find the feed, package id and version to download for `request`.
    ///
    /// Feeds are searched in order and, within a feed, candidate ids from most
    /// to least specific. An id the feed does not know, or knows with no
    /// versions, moves the search on. An id with versions but none compatible
    /// also moves on, and that failure is what gets reported if nothing else
    /// matches.
    ///
    /// # Errors
    ///
    /// [`Error::NoCompatibleVersion`] if some id had versions but none
    /// matched, [`Error::PackageNotFound`] if no feed knows any candidate id,
    /// [`Error::FeedNetworkError`] if a feed could not be queried.
    pub async fn resolve(
        &self,
        request: &SymbolRequest,
        token: &CancellationToken,
    ) -> Result<ResolvedPackage> {
        let ids = package_ids(request, &self.country);
        let mut incompatible: Option<Error> = None;

        for feed in &self.feeds {
            for id in &ids {
                let Some(available) = self.client.versions(&feed.base_url, id, token).await?
                else {
                    debug!(feed = %feed.name, package_id = %id, "not on feed");
                    continue;
                };
                if available.is_empty() {
                    debug!(feed = %feed.name, package_id = %id, "no versions");
                    continue;
                }

                if let Some(version) = find_compatible_version(&available, &request.version) {
                    info!(
                        feed = %feed.name,
                        package_id = %id,
                        requested = %request.version,
                        selected = version,
                        "resolved symbols"
                    );
                    return Ok(ResolvedPackage {
                        feed: feed.name.clone(),
                        feed_url: feed.base_url.clone(),
                        package_id: id.clone(),
                        version: version.to_string(),
                    });
                }

                if incompatible.is_none() {
                    incompatible = Some(Error::NoCompatibleVersion {
                        package_id: id.clone(),
                        requested: request.version.clone(),
                        same_minor: same_minor_versions(&available, &request.version),
                        available,
                    });
                }
            }
        }

        Err(incompatible.unwrap_or_else(|| Error::PackageNotFound {
            subject: request.to_string(),
            tried: ids,
        }))
    }

    /// Resolve `request` and write its payload into `output_dir`.
    ///
    /// # Errors
    ///
    /// Anything [`resolve`](Self::resolve) or [`NuGetFeedClient::download`] returns.
    pub async fn fetch(
        &self,
        request: &SymbolRequest,
        output_dir: &Path,
        token: &CancellationToken,
    ) -> Result<(ResolvedPackage, PathBuf)> {
        let resolved = self.resolve(request, token).await?;
        let file_name = request.payload_file_name(&resolved.version);
        let path = self
            .client
            .download(
                &resolved.feed_url,
                &resolved.package_id,
                &resolved.version,
                output_dir,
                &file_name,
                token,
            )
            .await?;
        Ok((resolved, path))
    }
}
