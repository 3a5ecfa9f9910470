// src/config.rs
// =============================================================================
// The immutable settings for one crawl.
//
// CrawlConfig is built once (from the CLI in main.rs, or directly in tests),
// validated, and then handed to the Crawler. Nothing in here changes while a
// crawl runs, so two crawls in the same process never share state.
//
// Depth convention:
// - the root URL is depth 0
// - links found on a depth-d page are depth d+1
// - a page only has its links followed while d < max_depth
// So max_depth = 0 fetches the root page alone, and max_depth = N follows
// exactly N link-hops from the root.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_EXTENSION: &str = "torrent";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Where the crawl starts (depth 0)
    pub root_url: Url,
    /// How many link-hops beyond the root are followed
    pub max_depth: usize,
    /// Directory artifacts are written into (flat, by URL basename)
    pub output_dir: PathBuf,
    /// Maximum outstanding requests per host
    pub parallelism: usize,
    /// Minimum gap between the start of two requests to the same host
    pub request_delay: Duration,
    /// Per-request timeout; None means wait forever
    pub request_timeout: Option<Duration>,
    /// File extension (without the dot) that marks an artifact
    pub artifact_extension: String,
    /// Only follow links that stay on the root URL's host
    pub same_host_only: bool,
}

impl CrawlConfig {
    // Builds a config with the default politeness policy
    //
    // Parameters:
    //   root_url: the page the crawl starts from (must be http or https)
    //   output_dir: where downloaded artifacts land
    pub fn new(root_url: &str, output_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root_url = Url::parse(root_url).map_err(|e| ConfigError::InvalidRoot {
            url: root_url.to_string(),
            reason: e.to_string(),
        })?;

        let config = Self {
            root_url,
            max_depth: DEFAULT_MAX_DEPTH,
            output_dir: output_dir.into(),
            parallelism: 1,
            request_delay: DEFAULT_DELAY,
            request_timeout: None,
            artifact_extension: DEFAULT_EXTENSION.to_string(),
            same_host_only: false,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    // Accepts "torrent" as well as ".torrent"
    pub fn with_artifact_extension(mut self, extension: &str) -> Self {
        self.artifact_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn with_same_host_only(mut self, same_host_only: bool) -> Self {
        self.same_host_only = same_host_only;
        self
    }

    // Checks the invariants the crawler relies on
    //
    // The builder methods don't validate on their own, so callers that use
    // them run this once more before starting the crawl.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.root_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRoot {
                url: self.root_url.to_string(),
                reason: format!("unsupported scheme '{}'", self.root_url.scheme()),
            });
        }
        if self.root_url.host_str().is_none() {
            return Err(ConfigError::InvalidRoot {
                url: self.root_url.to_string(),
                reason: "missing host".to_string(),
            });
        }
        if self.parallelism == 0 {
            return Err(ConfigError::InvalidParallelism(self.parallelism));
        }
        if self.artifact_extension.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        Ok(())
    }
}
