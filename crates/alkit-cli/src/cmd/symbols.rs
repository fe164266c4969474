//! `alkit symbols` - download the symbol packages an app compiles against.

use super::Context;
use alkit_core::symbols::{SymbolResolver, download_all, symbols_for};
use alkit_core::Reporter;
use alkit_schema::{AppManifest, Country};
use anyhow::{Context as _, Result};
use std::path::Path;

pub async fn symbols(
    ctx: &Context,
    manifest_path: &Path,
    output_dir: &Path,
    country: Option<&str>,
    concurrency: Option<usize>,
) -> Result<bool> {
    let manifest = AppManifest::load(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;
    let requests = symbols_for(&manifest);

    let country = country.map_or_else(|| ctx.settings.country.clone(), Country::new);
    let concurrency = concurrency.unwrap_or(ctx.settings.concurrency);
    let resolver = SymbolResolver::new(ctx.client.clone(), ctx.settings.feeds.clone(), country);

    ctx.output.section(&format!(
        "Downloading {} symbol packages for {}",
        requests.len(),
        manifest.name
    ));
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let report = download_all(
        &resolver,
        &requests,
        output_dir,
        concurrency,
        &ctx.output,
        &ctx.token,
    )
    .await;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for failure in &report.failures {
            ctx.output
                .error(&format!("{}: {}", failure.subject, failure.message));
        }
        let summary = format!(
            "{} of {} packages in {}",
            report.downloaded.len(),
            requests.len(),
            output_dir.display()
        );
        if report.success {
            ctx.output.success(&summary);
        } else {
            ctx.output.warning(&summary);
        }
    }

    Ok(report.success)
}
