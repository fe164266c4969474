//! HTTP byte-range access to remote archives.
//!
//! [`RangeSource`] is the seam the cache populates through: [`RangeFetcher`]
//! implements it over HTTP, tests implement it over in-memory buffers.
//! There is no fallback to a full download: a server that cannot
//! serve ranges is an error.

use crate::error::{Error, Result};
use crate::io::cancellable;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a HEAD request revealed about a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFile {
    /// Size of the file in bytes.
    pub total_size: u64,
    /// Whether the server advertised `Accept-Ranges: bytes`.
    pub supports_ranges: bool,
}

/// Random access to a remote file by inclusive byte range.
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Probe the file. Fails with [`Error::RangeUnsupported`] when the size is
    /// unknown or ranges are not advertised.
    async fn head(&self, url: &str, token: &CancellationToken) -> Result<RemoteFile>;

    /// Fetch bytes `start..=end_inclusive`.
    async fn get_range(
        &self,
        url: &str,
        start: u64,
        end_inclusive: u64,
        token: &CancellationToken,
    ) -> Result<Bytes>;

    /// Fetch up to the last `len` bytes of a file of `total_size` bytes.
    async fn get_tail(
        &self,
        url: &str,
        total_size: u64,
        len: u64,
        token: &CancellationToken,
    ) -> Result<Bytes> {
        if total_size == 0 {
            return Err(Error::CorruptArchive(format!("{url} is empty")));
        }
        let start = total_size.saturating_sub(len);
        self.get_range(url, start, total_size - 1, token).await
    }
}

/// [`RangeSource`] over HTTP.
#[derive(Clone)]
pub struct RangeFetcher {
    client: reqwest::Client,
}

impl RangeFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RangeSource for RangeFetcher {
    async fn head(&self, url: &str, token: &CancellationToken) -> Result<RemoteFile> {
        let resp = cancellable(token, async {
            Ok(self.client.head(url).send().await?.error_for_status()?)
        })
        .await?;

        // HEAD responses have no body, so read the header rather than content_length().
        let total_size = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let supports_ranges = resp
            .headers()
            .get(ACCEPT_RANGES)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"bytes"));

        debug!(url, ?total_size, supports_ranges, "HEAD");

        if !supports_ranges {
            return Err(Error::RangeUnsupported {
                url: url.to_string(),
                reason: "server does not advertise Accept-Ranges: bytes".to_string(),
            });
        }
        let Some(total_size) = total_size else {
            return Err(Error::RangeUnsupported {
                url: url.to_string(),
                reason: "missing Content-Length".to_string(),
            });
        };

        Ok(RemoteFile {
            total_size,
            supports_ranges,
        })
    }

    async fn get_range(
        &self,
        url: &str,
        start: u64,
        end_inclusive: u64,
        token: &CancellationToken,
    ) -> Result<Bytes> {
        if end_inclusive < start {
            return Err(Error::CorruptArchive(format!(
                "invalid byte range {start}-{end_inclusive}"
            )));
        }
        debug!(url, start, end_inclusive, "GET range");

        cancellable(token, async {
            let resp = self
                .client
                .get(url)
                .header(RANGE, format!("bytes={start}-{end_inclusive}"))
                .send()
                .await?;

            let status = resp.status();
            if status != StatusCode::PARTIAL_CONTENT {
                return Err(Error::UnexpectedRangeResponse {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.bytes().await?;
            let expected = end_inclusive - start + 1;
            if body.len() as u64 != expected {
                return Err(Error::CorruptArchive(format!(
                    "range {start}-{end_inclusive} of {url} returned {} bytes, expected {expected}",
                    body.len()
                )));
            }
            Ok(body)
        })
        .await
    }
}
