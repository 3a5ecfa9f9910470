// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the Cli struct below *is* the interface, and
// clap generates the parser, --help and --version from it. Missing
// positional arguments make clap print the usage and exit non-zero.
//
// The politeness knobs can also be set from the environment (clap's `env`
// feature), which is handy for cron jobs.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{CrawlConfig, DEFAULT_EXTENSION};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(
    name = "torrent-harvest",
    version,
    about = "Crawl a site to a bounded depth and mirror the torrent files it links to",
    long_about = "torrent-harvest follows links from URL up to --depth hops and saves every \
                  torrent file it finds into OUTDIR. Files already in OUTDIR are only \
                  downloaded again when the server reports a different size."
)]
pub struct Cli {
    /// Page to start crawling from (e.g., https://example.com/torrents/)
    pub url: String,

    /// Directory torrent files are saved into (created if missing)
    pub outdir: PathBuf,

    /// Number of link-hops to follow from the start page
    ///
    /// The start page is depth 0, pages linked from it are depth 1, etc.
    /// Depth 0 fetches only the start page.
    #[arg(short, long, default_value_t = 1)]
    pub depth: usize,

    /// Minimum delay between two requests to the same host, in milliseconds
    #[arg(long, default_value_t = 1000, env = "TORRENT_HARVEST_DELAY_MS")]
    pub delay_ms: u64,

    /// Give up on a request after this many seconds (default: wait forever)
    #[arg(long, env = "TORRENT_HARVEST_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum number of outstanding requests per host
    #[arg(long, default_value_t = 1)]
    pub parallelism: usize,

    /// File extension that marks a downloadable artifact
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Only follow links that stay on the start page's host
    #[arg(long)]
    pub same_host: bool,

    /// Print the final report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    // Turns the parsed arguments into a validated crawl configuration
    pub fn crawl_config(&self) -> Result<CrawlConfig, ConfigError> {
        let config = CrawlConfig::new(&self.url, self.outdir.clone())?
            .with_max_depth(self.depth)
            .with_request_delay(Duration::from_millis(self.delay_ms))
            .with_request_timeout(self.timeout.map(Duration::from_secs))
            .with_parallelism(self.parallelism)
            .with_artifact_extension(&self.extension)
            .with_same_host_only(self.same_host);
        config.validate()?;
        Ok(config)
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why does --depth 1 mean "the start page plus the pages it links to"?
//    - The start page is depth 0 and every followed link adds one
//    - --depth counts link-hops, so --depth 0 only fetches URL itself
//
// 2. Why single dashes don't work for long flags
//    - clap follows the GNU convention: -d 2 or --depth 2, not -depth 2
// -----------------------------------------------------------------------------
