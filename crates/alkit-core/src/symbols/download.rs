//! Batch download of symbol packages with a per-request report.

use crate::error::Failure;
use crate::reporter::Reporter;
use crate::symbols::resolver::{ResolvedPackage, SymbolResolver};
use alkit_schema::SymbolRequest;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// One successfully downloaded payload.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedSymbol {
    pub request: SymbolRequest,
    #[serde(flatten)]
    pub resolved: ResolvedPackage,
    pub path: PathBuf,
}

/// Outcome of a batch download. `success` holds only if every request succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub success: bool,
    pub downloaded: Vec<DownloadedSymbol>,
    pub failures: Vec<Failure>,
}

/// Download every request into `output_dir`, running up to `concurrency` at
/// once. A failing request does not stop the others; results keep request order.
pub async fn download_all(
    resolver: &SymbolResolver,
    requests: &[SymbolRequest],
    output_dir: &Path,
    concurrency: usize,
    reporter: &dyn Reporter,
    token: &CancellationToken,
) -> SymbolReport {
    let results: Vec<_> = futures::stream::iter(requests)
        .map(|request| async move {
            let subject = request.to_string();
            reporter.downloading(&subject, &request.version, 0, None);
            let res = resolver.fetch(request, output_dir, token).await;
            match &res {
                Ok((resolved, _)) => reporter.done(&subject, &resolved.version, None),
                Err(e) => reporter.failed(&subject, &e.to_string()),
            }
            (request, res)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut downloaded = Vec::new();
    let mut failures = Vec::new();
    for (request, res) in results {
        match res {
            Ok((resolved, path)) => downloaded.push(DownloadedSymbol {
                request: request.clone(),
                resolved,
                path,
            }),
            Err(e) => {
                warn!(request = %request, error = %e, "symbol download failed");
                failures.push(Failure::new(request.to_string(), &e));
            }
        }
    }

    SymbolReport {
        success: failures.is_empty(),
        downloaded,
        failures,
    }
}
