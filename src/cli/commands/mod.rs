//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod acquire;
mod batch;
mod health;
mod probe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "siteacquire")]
#[command(about = "Website content acquisition with strategy escalation")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire one URL, escalating through strategies until content passes the quality gate
    Acquire {
        /// URL to acquire (scheme optional)
        url: String,
        /// Try identity rotation and archive sources if every strategy fails
        #[arg(short, long)]
        fallback: bool,
        /// Overall deadline in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Acquire many URLs concurrently
    Batch {
        /// URLs to acquire
        urls: Vec<String>,
        /// Read URLs from a file, one per line (# starts a comment)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Maximum URLs in flight (default from config)
        #[arg(short = 'n', long)]
        concurrency: Option<usize>,
        /// Overall batch deadline in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Deadline per URL in seconds
        #[arg(long)]
        url_timeout: Option<u64>,
        /// Print per-URL results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch robots.txt and sitemap.xml for a site
    Probe {
        /// Any URL on the site
        url: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the render and fast-scrape services
    Health,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Acquire {
            url,
            fallback,
            timeout,
            json,
        } => acquire::cmd_acquire(&settings, &url, fallback, timeout, json).await,
        Commands::Batch {
            urls,
            file,
            concurrency,
            timeout,
            url_timeout,
            json,
        } => {
            batch::cmd_batch(
                &settings,
                batch::BatchArgs {
                    urls,
                    file,
                    concurrency,
                    timeout,
                    url_timeout,
                    json,
                },
            )
            .await
        }
        Commands::Probe { url, json } => probe::cmd_probe(&settings, &url, json).await,
        Commands::Health => health::cmd_health(&settings).await,
    }
}
