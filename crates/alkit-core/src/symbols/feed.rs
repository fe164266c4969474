//! Read-only client for NuGet v3 flat-container feeds.
//!
//! Only two endpoints are used:
//!
//! ```text
//! GET {base}/{id}/index.json                  {"versions": [...]}
//! GET {base}/{id}/{version}/{id}.{version}.nupkg
//! ```
//!
//! Ids are lowercased in URLs, as the flat-container protocol requires.

use crate::error::{Error, Result};
use crate::io::{blocking, cancellable};
use alkit_schema::PAYLOAD_EXTENSION;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Deserialize)]
struct VersionList {
    versions: Vec<String>,
}

pub struct NuGetFeedClient {
    client: reqwest::Client,
    /// Version lists per (feed, lowercased id). `None` records a 404.
    versions: Mutex<HashMap<(String, String), Option<Vec<String>>>>,
}

impl NuGetFeedClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            versions: Mutex::new(HashMap::new()),
        }
    }

    /// Versions published for `package_id`, or `None` if the feed does not know it.
    /// Results are memoized for the lifetime of the client.
    ///
    /// # Errors
    ///
    /// [`Error::FeedNetworkError`] on transport failures and unexpected statuses.
    pub async fn versions(
        &self,
        feed_base: &str,
        package_id: &str,
        token: &CancellationToken,
    ) -> Result<Option<Vec<String>>> {
        let id = package_id.to_lowercase();
        let key = (feed_base.to_string(), id.clone());
        if let Some(cached) = self.versions.lock().await.get(&key) {
            return Ok(cached.clone());
        }

        let url = format!("{feed_base}/{id}/index.json");
        debug!(url, "querying package versions");

        let fetched = cancellable(token, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::feed(&url, e))?;
            let status = resp.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(Error::feed(&url, format!("HTTP {status}")));
            }
            let body = resp.bytes().await.map_err(|e| Error::feed(&url, e))?;
            let list: VersionList =
                serde_json::from_slice(&body).map_err(|e| Error::feed(&url, e))?;
            Ok(Some(list.versions))
        })
        .await?;

        self.versions.lock().await.insert(key, fetched.clone());
        Ok(fetched)
    }

    /// Download a package and write its single payload file to
    /// `dest_dir/file_name`. The write goes through a temporary sibling that
    /// is renamed into place.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFileName`] if `file_name` is not a single path component,
    /// [`Error::FeedNetworkError`] if the package cannot be fetched,
    /// [`Error::PayloadNotFoundInPackage`] or [`Error::AmbiguousPayload`] if it
    /// does not contain exactly one payload.
    pub async fn download(
        &self,
        feed_base: &str,
        package_id: &str,
        version: &str,
        dest_dir: &Path,
        file_name: &str,
        token: &CancellationToken,
    ) -> Result<PathBuf> {
        let dest = dest_dir.join(file_name);
        let mut components = Path::new(file_name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || dest.parent() != Some(dest_dir) {
            return Err(Error::InvalidFileName {
                name: file_name.to_string(),
            });
        }

        let id = package_id.to_lowercase();
        let lower_version = version.to_lowercase();
        let url = format!("{feed_base}/{id}/{lower_version}/{id}.{lower_version}.nupkg");
        debug!(url, "downloading package");

        let body = cancellable(token, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::feed(&url, e))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::feed(&url, format!("HTTP {status}")));
            }
            resp.bytes().await.map_err(|e| Error::feed(&url, e))
        })
        .await?;

        let package_id = package_id.to_string();
        let version = version.to_string();
        let dest_dir = dest_dir.to_path_buf();
        blocking(move || {
            let mut archive = zip::ZipArchive::new(Cursor::new(body))?;
            let payloads: Vec<String> = archive
                .file_names()
                .filter(|n| !n.ends_with('/'))
                .filter(|n| n.to_lowercase().ends_with(PAYLOAD_EXTENSION))
                .map(str::to_string)
                .collect();

            let entry_name = match payloads.as_slice() {
                [single] => single.clone(),
                [] => {
                    return Err(Error::PayloadNotFoundInPackage {
                        package_id,
                        version,
                        extension: PAYLOAD_EXTENSION.to_string(),
                    });
                }
                _ => {
                    let mut entries = payloads;
                    entries.sort();
                    return Err(Error::AmbiguousPayload {
                        package_id,
                        version,
                        entries,
                    });
                }
            };

            std::fs::create_dir_all(&dest_dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dest_dir)?;
            let mut entry = archive.by_name(&entry_name)?;
            std::io::copy(&mut entry, &mut tmp)?;
            tmp.flush()?;
            tmp.persist(&dest).map_err(|e| e.error)?;
            debug!(path = %dest.display(), entry = %entry_name, "wrote payload");
            Ok(dest)
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// A `.nupkg` holding the given entries.
    pub(crate) fn nupkg(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("package.nuspec", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<package/>").unwrap();
            for (name, content) in entries {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_versions_and_memoization() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/microsoft.platform.symbols/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"versions": ["26.5.1", "27.0.5"]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = NuGetFeedClient::new(reqwest::Client::new());
        let token = CancellationToken::new();
        for _ in 0..2 {
            let versions = client
                .versions(&server.url(), "Microsoft.Platform.Symbols", &token)
                .await
                .unwrap();
            assert_eq!(versions, Some(vec!["26.5.1".to_string(), "27.0.5".to_string()]));
        }
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_versions_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/unknown.symbols/index.json")
            .with_status(404)
            .create_async()
            .await;

        let client = NuGetFeedClient::new(reqwest::Client::new());
        let versions = client
            .versions(&server.url(), "unknown.symbols", &CancellationToken::new())
            .await
            .unwrap();
        assert!(versions.is_none());
    }

    #[tokio::test]
    async fn test_versions_server_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/broken.symbols/index.json")
            .with_status(503)
            .create_async()
            .await;

        let client = NuGetFeedClient::new(reqwest::Client::new());
        let err = client
            .versions(&server.url(), "broken.symbols", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FeedNetworkError { .. }));
    }

    #[tokio::test]
    async fn test_download_extracts_single_payload() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock(
                "GET",
                "/microsoft.platform.symbols/27.0.5/microsoft.platform.symbols.27.0.5.nupkg",
            )
            .with_status(200)
            .with_body(nupkg(&[("content/Microsoft_System_27.0.5.app", b"payload")]))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = NuGetFeedClient::new(reqwest::Client::new());
        let path = client
            .download(
                &server.url(),
                "microsoft.platform.symbols",
                "27.0.5",
                dir.path(),
                "Microsoft_System_27.0.5.app",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("Microsoft_System_27.0.5.app"));
        assert_eq!(std::fs::read(path).unwrap(), b"payload");
        // Only the payload remains; the temporary sibling was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_download_rejects_path_in_file_name() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/pkg/1.0.0/pkg.1.0.0.nupkg")
            .with_status(200)
            .with_body(nupkg(&[("Pkg.app", b"payload")]))
            .expect(0)
            .create_async()
            .await;

        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        let client = NuGetFeedClient::new(reqwest::Client::new());
        for name in ["../escape.app", "nested/escape.app", ""] {
            let err = client
                .download(
                    &server.url(),
                    "pkg",
                    "1.0.0",
                    &out,
                    name,
                    &CancellationToken::new(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidFileName { .. }), "{name}");
        }
        assert!(!root.path().join("escape.app").exists());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_without_payload() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/pkg/1.0.0/pkg.1.0.0.nupkg")
            .with_status(200)
            .with_body(nupkg(&[("readme.txt", b"nothing here")]))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = NuGetFeedClient::new(reqwest::Client::new());
        let err = client
            .download(
                &server.url(),
                "pkg",
                "1.0.0",
                dir.path(),
                "x.app",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PayloadNotFoundInPackage { .. }));
        assert!(!dir.path().join("x.app").exists());
    }

    #[tokio::test]
    async fn test_download_ambiguous_payload() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/pkg/1.0.0/pkg.1.0.0.nupkg")
            .with_status(200)
            .with_body(nupkg(&[("a.app", b"a"), ("b.APP", b"b")]))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let client = NuGetFeedClient::new(reqwest::Client::new());
        let err = client
            .download(
                &server.url(),
                "pkg",
                "1.0.0",
                dir.path(),
                "x.app",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousPayload { ref entries, .. } if entries.len() == 2));
    }
}
