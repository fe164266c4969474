//! alkit - AL compiler and symbol acquisition CLI

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use alkit_cli::cmd::{self, Context};
use alkit_cli::{CacheCommands, Cli, Commands, CompilerCommands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let token = CancellationToken::new();
    watch_for_cancellation(&token, cli.timeout);

    match run(cli, token).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Cancel `token` on Ctrl-C, or once `timeout_secs` have elapsed.
fn watch_for_cancellation(token: &CancellationToken, timeout_secs: Option<u64>) {
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let on_timeout = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(secs, "timeout reached, cancelling");
            on_timeout.cancel();
        });
    }
}

async fn run(cli: Cli, token: CancellationToken) -> Result<bool> {
    if let Commands::Completions { shell } = cli.command {
        cmd::completions::completions(shell);
        return Ok(true);
    }

    let ctx = Context::new(cli.settings(), cli.json, token)?;

    match cli.command {
        Commands::Compiler { command } => match command {
            CompilerCommands::Ensure { version } => cmd::compiler::ensure(&ctx, &version).await,
            CompilerCommands::Status { version } => cmd::compiler::status(&ctx, &version),
            CompilerCommands::Path { version, file } => {
                cmd::compiler::path(&ctx, &version, &file)
            }
        },
        Commands::Cache { command } => match command {
            CacheCommands::List => cmd::cache::list(&ctx),
            CacheCommands::Clean { version } => cmd::cache::clean(&ctx, version.as_deref()).await,
        },
        Commands::Symbols {
            manifest,
            output,
            country,
            concurrency,
        } => {
            cmd::symbols::symbols(&ctx, &manifest, &output, country.as_deref(), concurrency).await
        }
        Commands::Completions { .. } => Ok(true),
    }
}
