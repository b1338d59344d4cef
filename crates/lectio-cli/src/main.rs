//! lectio CLI - live meta-search for scholarly theology and philosophy.
//!
//! # Usage
//!
//! ```bash
//! # Live web search
//! lectio "aquinas natural law"
//! lectio "divine simplicity" -n 5 --json
//!
//! # Watch both streaming phases as server-sent events
//! lectio "providence" --stream
//!
//! # Search a local directory of documents instead of the web
//! lectio "grace" --local --index ./notes
//! ```

mod config;
mod output;
mod search;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Live meta-search for scholarly theology and philosophy material.
///
/// Candidates are discovered, fetched, and ranked at query time; nothing
/// is crawled or stored between queries.
#[derive(Parser)]
#[command(name = "lectio", version, about)]
struct Cli {
    /// Search query
    query: Option<String>,

    /// Maximum number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    limit: usize,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Emit the two streaming phases as server-sent events
    #[arg(long, conflicts_with = "local")]
    stream: bool,

    /// Search a local index instead of the live web
    #[arg(long, requires = "index")]
    local: bool,

    /// Directory of documents to index for --local
    #[arg(long)]
    index: Option<PathBuf>,

    /// Honor robots.txt when fetching candidate pages
    #[arg(long)]
    respect_robots: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let Some(query) = cli.query.as_deref() else {
        eprintln!("No search query provided. Use --help for usage information.");
        std::process::exit(1);
    };

    // Ctrl-C cancels the in-flight pipeline at its next suspension point.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if cli.local {
        let index_dir = cli
            .index
            .as_deref()
            .context("--local requires --index <dir>")?;
        let result = search::execute_local(query, cli.limit, index_dir)?;
        println!("{}", output::render(&result, cli.json)?);
        return Ok(());
    }

    let engine_config = config::live_config(&cli);
    if cli.stream {
        search::execute_streamed(query, cli.limit, engine_config, &cancel).await?;
        return Ok(());
    }

    let result = search::execute_live(query, cli.limit, engine_config, &cancel).await?;
    println!("{}", output::render(&result, cli.json)?);
    Ok(())
}
