//! alkit - compiler and symbol acquisition for AL projects
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Fetches the AL compiler for a platform version into a shared per-user cache,
//! and downloads the symbol packages an app compiles against.
//!
//! # Cache Layout
//!
//! ```text
//! <cache>/
//! ├── 27.0/
//! │   ├── Microsoft.Dynamics.Framework.UI.Client.dll
//! │   ├── Newtonsoft.Json.dll
//! │   ├── compiler/        # alc and its runtime
//! │   └── .complete        # completion marker
//! └── locks/               # one lock file per version
//! ```

pub mod cmd;
pub mod ui;

use alkit_core::Settings;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "alkit")]
#[command(author, version, about = "alkit - AL compiler and symbol acquisition")]
pub struct Cli {
    /// Print a machine-readable JSON report instead of styled output
    #[arg(long, global = true)]
    pub json: bool,

    /// Abort network operations after this many seconds
    #[arg(long, global = true, env = "ALKIT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Cache root directory
    #[arg(long, global = true, env = "ALKIT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Release channel of the distribution CDN
    #[arg(long, global = true, env = "ALKIT_CHANNEL")]
    pub channel: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage cached compilers
    Compiler {
        #[command(subcommand)]
        command: CompilerCommands,
    },
    /// Inspect or clean the artifact cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Download the symbol packages an app depends on
    Symbols {
        /// Path to the app manifest (app.json)
        #[arg(default_value = "app.json")]
        manifest: PathBuf,
        /// Directory the .app payloads are written to
        #[arg(short, long, default_value = ".alpackages")]
        output: PathBuf,
        /// Localization country (e.g. us, dk); w1 for none
        #[arg(long, env = "ALKIT_COUNTRY")]
        country: Option<String>,
        /// Maximum concurrent downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum CompilerCommands {
    /// Download the compiler for a version unless it is already cached
    Ensure {
        /// Coarse platform version (e.g. 27.0)
        version: String,
    },
    /// Show whether a version is cached and complete
    Status {
        /// Coarse platform version
        version: String,
    },
    /// Print the path of a file inside a cached version
    Path {
        /// Coarse platform version
        version: String,
        /// File name (e.g. alc, Newtonsoft.Json.dll)
        file: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// List cached versions
    List,
    /// Remove one cached version, or all of them
    Clean {
        /// Coarse platform version; omit to remove everything
        version: Option<String>,
    },
}

impl Cli {
    /// Settings from the environment with command-line overrides applied.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(dir) = &self.cache_dir {
            settings.cache_root.clone_from(dir);
        }
        if let Some(channel) = &self.channel {
            settings.channel.clone_from(channel);
        }
        settings
    }

    /// Default log filter for the verbosity flag, used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "alkit_core=debug,alkit_cli=debug,info",
            _ => "trace",
        }
    }
}
