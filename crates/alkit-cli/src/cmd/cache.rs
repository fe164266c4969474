//! `alkit cache` - list and clean cached versions.

use super::{CommandReport, Context};
use crate::ui::{format_size, table::cache_table};
use alkit_core::{CacheEntryInfo, Reporter};
use anyhow::Result;
use serde::Serialize;

/// List every cached version.
pub fn list(ctx: &Context) -> Result<bool> {
    let entries = ctx.cache().list_entries()?;

    ctx.emit(&CommandReport::ok(entries), |entries: &Vec<CacheEntryInfo>| {
        if entries.is_empty() {
            ctx.output.info("Cache is empty");
            return;
        }
        println!("{}", cache_table(entries));
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        ctx.output.info(&format!(
            "{} versions, {} in {}",
            entries.len(),
            format_size(total),
            ctx.settings.cache_root.display()
        ));
    })
}

#[derive(Debug, Serialize)]
pub struct CleanResult {
    pub removed: Vec<String>,
}

/// Remove one version, or every version when `version` is `None`.
pub async fn clean(ctx: &Context, version: Option<&str>) -> Result<bool> {
    let cache = ctx.cache();
    let outcome = match version {
        Some(v) => cache
            .remove(v, &ctx.token)
            .await
            .map(|removed| if removed { vec![v.to_string()] } else { Vec::new() }),
        None => cache.clear(&ctx.token).await,
    };

    let report = match outcome {
        Ok(removed) => CommandReport::ok(CleanResult { removed }),
        Err(e) => CommandReport::failed(version.unwrap_or("cache"), &e),
    };

    ctx.emit(&report, |r| {
        if r.removed.is_empty() {
            ctx.output.info("Nothing to remove");
        } else {
            ctx.output
                .success(&format!("Removed {}", r.removed.join(", ")));
        }
    })
}
