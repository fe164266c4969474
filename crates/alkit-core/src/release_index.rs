//! Resolution of coarse platform versions against the published release index.

use crate::error::{Error, Result};
use crate::io::cancellable;
use alkit_schema::ReleaseDescriptor;
use alkit_schema::version::{parse_version_parts, version_matches_segments};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The release list of one channel, fetched at most once per instance.
pub struct VersionIndex {
    /// `None` for indexes built over a fixed release list.
    client: Option<reqwest::Client>,
    index_url: String,
    channel: String,
    releases: OnceCell<Vec<ReleaseDescriptor>>,
}

impl VersionIndex {
    pub fn new(client: reqwest::Client, index_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            index_url: index_url.into(),
            channel: channel.into(),
            releases: OnceCell::new(),
        }
    }

    /// Build an index over a fixed release list. Nothing is ever fetched.
    pub fn with_releases(channel: impl Into<String>, releases: Vec<ReleaseDescriptor>) -> Self {
        Self {
            client: None,
            index_url: String::new(),
            channel: channel.into(),
            releases: OnceCell::new_with(Some(releases)),
        }
    }

    /// The channel this index lists.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// All releases of the channel. The first successful fetch is memoized;
    /// failures are not, so a later call retries.
    ///
    /// # Errors
    ///
    /// [`Error::IndexUnavailable`] on any network or parse failure,
    /// [`Error::Cancelled`] if `token` fires first.
    pub async fn releases(&self, token: &CancellationToken) -> Result<&[ReleaseDescriptor]> {
        let releases = self
            .releases
            .get_or_try_init(|| async {
                let releases = cancellable(token, self.fetch()).await?;
                info!(
                    channel = %self.channel,
                    count = releases.len(),
                    "loaded release index"
                );
                Ok::<_, Error>(releases)
            })
            .await?;
        Ok(releases)
    }

    async fn fetch(&self) -> Result<Vec<ReleaseDescriptor>> {
        let unavailable = |message: String| Error::IndexUnavailable {
            url: self.index_url.clone(),
            message,
        };

        let Some(client) = &self.client else {
            return Err(unavailable("no HTTP client configured".to_string()));
        };

        debug!(url = %self.index_url, "fetching release index");
        let resp = client
            .get(&self.index_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| unavailable(e.to_string()))?;
        let body = resp.bytes().await.map_err(|e| unavailable(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| unavailable(format!("invalid index: {e}")))
    }

    /// Resolve a coarse version ("27.0") to the most recently published
    /// release that has it as a dot-separated prefix.
    ///
    /// Releases published at the same instant are ordered by version, highest wins.
    ///
    /// # Errors
    ///
    /// [`Error::NoMatchingRelease`] if nothing matches, plus anything
    /// [`releases`](Self::releases) returns.
    pub async fn resolve(&self, coarse_version: &str, token: &CancellationToken) -> Result<String> {
        let releases = self.releases(token).await?;

        let best = releases
            .iter()
            .filter(|r| version_matches_segments(&r.version, coarse_version))
            .max_by_key(|r| (r.published_at, parse_version_parts(&r.version), r.version.clone()))
            .ok_or_else(|| Error::NoMatchingRelease {
                channel: self.channel.clone(),
                requested: coarse_version.to_string(),
            })?;

        debug!(coarse_version, resolved = %best.version, "resolved release");
        Ok(best.version.clone())
    }
}
