// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is one required argument: how many Co-authored-by lines to print.
// The flags tune the crawl and have sensible defaults.
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Derive macros: Automatically generate code for our types
// - value_parser ranges: clap rejects 0 and non-numbers for us
// =============================================================================

use clap::Parser;

use coauthor_harvest::config::{
    CrawlConfig, DEFAULT_CONCURRENCY, DEFAULT_DEPTH, DEFAULT_GROUP_SIZE, DEFAULT_NOREPLY_DOMAIN,
};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "coauthor-harvest",
    version,
    about = "Prints Co-authored-by trailers for GitHub users with noreply commit emails",
    long_about = "coauthor-harvest walks GitHub's most-followed users and their followers, \
                  looks up the email on each follower's latest commit, and prints a \
                  Co-authored-by trailer for every GitHub noreply address it finds. \
                  Set GITHUB_TOKEN to a personal access token before running."
)]
pub struct Cli {
    /// Number of Co-authored-by lines to print
    ///
    /// This is a positional argument (required, must be at least 1)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,

    /// Co-authors to collect from each root user's followers before moving on
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Users per bulk email request
    #[arg(long, default_value_t = DEFAULT_GROUP_SIZE)]
    pub group_size: usize,

    /// Bulk email requests in flight at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

impl Cli {
    // Turns the parsed flags into the crawl's configuration
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            group_size: self.group_size,
            concurrency: self.concurrency,
            depth: self.depth,
            noreply_domain: DEFAULT_NOREPLY_DOMAIN.to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is `count` a u64 with a range?
//    - clap checks the value before our code runs
//    - "abc", "-3" and "0" all become usage errors with exit code 2
//    - No network request is made for a bad command line
//
// 2. What does default_value_t do?
//    - Uses a typed Rust value as the default (not a string)
//    - The default shows up in --help automatically
// -----------------------------------------------------------------------------
