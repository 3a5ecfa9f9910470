// src/crawl/report.rs
// =============================================================================
// What a finished crawl hands back to its caller.
//
// #[derive(Serialize)] lets main.rs print the whole report with --json.
// =============================================================================

use std::path::PathBuf;

use serde::Serialize;

// One URL that could not be handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlFailure {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CrawlReport {
    /// URLs dispatched for visiting (pages and artifacts)
    pub visited: usize,
    /// Pages fetched successfully
    pub pages: usize,
    /// Artifacts written to disk during this crawl
    pub downloaded: Vec<PathBuf>,
    /// Artifacts already present with the remote size
    pub skipped: usize,
    /// Per-URL errors; none of them stopped the crawl
    pub failures: Vec<CrawlFailure>,
    /// The crawl was stopped before the queue ran dry
    pub cancelled: bool,
}

impl CrawlReport {
    // True when every URL was handled and the crawl ran to completion
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}
