// src/error.rs
// =============================================================================
// Error types shared by the crawl layers.
//
// Library-style code returns these typed errors (built with `thiserror`),
// while main.rs wraps everything in anyhow::Result like before.
//
// None of these abort a crawl: the engine turns them into CrawlFailure
// entries and moves on to the next URL. The only fatal errors are the ones
// raised before the crawl starts (bad config, output directory).
// =============================================================================

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

// Errors raised while talking to the remote server
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout, or body read failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a 2xx
    #[error("request to {url} returned HTTP {}", .status.as_u16())]
    Status { url: String, status: StatusCode },

    /// Writing a downloaded body to disk failed
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The crawl was cancelled before or while the request was in flight
    #[error("request to {0} cancelled")]
    Cancelled(String),
}

// Errors raised while turning an href into an absolute URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("malformed link '{href}': {reason}")]
    Malformed { href: String, reason: String },

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
}

// Errors raised while deciding whether an artifact needs downloading
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no file name in {0}")]
    NoFileName(String),

    #[error("cannot stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

// Errors raised while validating the crawl configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid root URL '{url}': {reason}")]
    InvalidRoot { url: String, reason: String },

    #[error("parallelism must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("artifact extension must not be empty")]
    EmptyExtension,

    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}
