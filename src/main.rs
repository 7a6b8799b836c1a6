// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap (bad input exits before any
//    network activity)
// 2. Set up logging to stderr, so stdout only carries Co-authored-by lines
// 3. Build the GitHub client and the crawler
// 4. Pull records until we have printed as many as were asked for
// 5. Exit with proper code (0 = target reached, 1 = fell short, 2 = error)
//
// Rust concepts used:
// - async/await: The crawl waits on many network requests
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Streams: The crawl is a lazy stream; we just stop pulling when done
// =============================================================================

mod cli;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use coauthor_harvest::github::{Governor, HttpTransport};
use coauthor_harvest::{emit_records, ClientConfig, Crawler};

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Parse before anything else; clap exits with code 2 on bad arguments
    let cli = Cli::parse();

    init_logging();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Diagnostics go to stderr; RUST_LOG overrides the default "info" level
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// This is the main application logic
// Returns:
//   Ok(0) = printed every requested line
//   Ok(1) = the crawl ran dry first
//   Err = configuration or startup error
async fn run(cli: Cli) -> Result<i32> {
    let config = cli.crawl_config();
    config.validate()?;

    let client_config = ClientConfig::from_env()?;
    if client_config.token.is_none() {
        // Not fatal: requests will fail through the normal error path
        warn!("GITHUB_TOKEN is not set; GitHub will reject most queries");
    }

    let transport = HttpTransport::new(&client_config).context("failed to build HTTP client")?;
    let crawler = Crawler::new(Governor::new(transport), config);

    let target = usize::try_from(cli.count).context("count is too large")?;
    info!("looking for {} co-author(s)", target);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = emit_records(crawler.into_stream(), target, &mut out)
        .await
        .context("failed to write output")?;
    out.flush()?;

    if written < target {
        warn!("only found {} of {} requested co-author(s)", written, target);
        return Ok(1);
    }

    info!("done: {} co-author(s) printed", written);
    Ok(0)
}
