//! Command implementations.
//!
//! Every command produces a [`CommandReport`]; `--json` prints it verbatim,
//! otherwise the command renders a human summary. The returned flag becomes
//! the process exit status.

pub mod cache;
pub mod compiler;
pub mod completions;
pub mod symbols;

use crate::ui::Output;
use alkit_core::{ArtifactCache, Error, Failure, Settings};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Structured outcome of a command.
#[derive(Debug, Serialize)]
pub struct CommandReport<T: Serialize> {
    pub success: bool,
    pub result: Option<T>,
    pub failures: Vec<Failure>,
}

impl<T: Serialize> CommandReport<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            failures: Vec::new(),
        }
    }

    pub fn failed(subject: &str, err: &Error) -> Self {
        Self {
            success: false,
            result: None,
            failures: vec![Failure::new(subject, err)],
        }
    }
}

/// State shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub client: reqwest::Client,
    pub output: Output,
    pub json: bool,
    pub token: CancellationToken,
}

impl Context {
    pub fn new(settings: Settings, json: bool, token: CancellationToken) -> Result<Self> {
        Ok(Self {
            settings,
            client: alkit_core::http_client()?,
            output: Output::new(json),
            json,
            token,
        })
    }

    pub fn cache(&self) -> ArtifactCache {
        ArtifactCache::new(self.settings.clone(), self.client.clone())
            .with_reporter(Arc::new(self.output))
    }

    /// Print `report` as JSON, or hand it to `human` for styled output.
    /// Returns the report's success flag.
    pub fn emit<T: Serialize>(
        &self,
        report: &CommandReport<T>,
        human: impl FnOnce(&T),
    ) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            if let Some(result) = &report.result {
                human(result);
            }
            for failure in &report.failures {
                self.output
                    .error(&format!("{}: {}", failure.subject, failure.message));
            }
        }
        Ok(report.success)
    }
}
