//! `alkit compiler` - ensure, inspect and locate cached compilers.

use super::{CommandReport, Context};
use alkit_core::{CompletionMarker, Reporter};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct EnsureResult {
    pub version: String,
    pub full_version: Option<String>,
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub version: String,
    pub path: PathBuf,
    pub ready: bool,
    pub marker: Option<CompletionMarker>,
}

#[derive(Debug, Serialize)]
pub struct PathResult {
    pub version: String,
    pub file: String,
    pub path: PathBuf,
}

/// Make sure `version` is cached, downloading it if needed.
pub async fn ensure(ctx: &Context, version: &str) -> Result<bool> {
    let cache = ctx.cache();
    let report = match cache.ensure_ready(version, &ctx.token).await {
        Ok(path) => CommandReport::ok(EnsureResult {
            version: version.to_string(),
            full_version: cache.read_marker(version).map(|m| m.full_version),
            path,
        }),
        Err(e) => CommandReport::failed(version, &e),
    };

    ctx.emit(&report, |r| println!("{}", r.path.display()))
}

/// Report whether `version` is cached and complete. Never touches the network.
pub fn status(ctx: &Context, version: &str) -> Result<bool> {
    let cache = ctx.cache();
    let result = StatusResult {
        version: version.to_string(),
        path: cache.entry_path(version),
        ready: cache.is_ready(version),
        marker: cache.read_marker(version),
    };

    ctx.emit(&CommandReport::ok(result), |r| {
        if r.ready {
            let release = r.marker.as_ref().map_or("?", |m| m.full_version.as_str());
            ctx.output.success(&format!("{} ready ({release})", r.version));
        } else {
            ctx.output.info(&format!("{} not cached", r.version));
        }
        println!("{}", r.path.display());
    })
}

/// Print the path of `file` inside a ready entry.
pub fn path(ctx: &Context, version: &str, file: &str) -> Result<bool> {
    let report = match ctx.cache().path_to(version, file) {
        Ok(path) => CommandReport::ok(PathResult {
            version: version.to_string(),
            file: file.to_string(),
            path,
        }),
        Err(e) => CommandReport::failed(&format!("{version}/{file}"), &e),
    };

    ctx.emit(&report, |r| println!("{}", r.path.display()))
}
