// src/crawl/events.rs
// =============================================================================
// Progress events emitted by the crawler.
//
// The engine doesn't print anything itself. Whoever owns the crawl can pass
// in an mpsc sender and turn these into a progress trace (main.rs prints
// them line by line), a progress bar, or nothing at all.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use url::Url;

use super::sync::SyncDecision;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// A page is about to be fetched
    PageVisited { url: Url, depth: usize },
    /// The sync policy has decided what to do with an artifact
    ArtifactEvaluated { url: Url, decision: SyncDecision },
    /// An artifact was written to disk
    ArtifactDownloaded { url: Url, path: PathBuf, bytes: u64 },
    /// Something went wrong for one URL (the crawl carries on)
    Error { url: String, message: String },
}

// One line of the human-readable progress trace
impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlEvent::PageVisited { url, depth } => {
                write!(f, "Visiting {} (depth {})", url, depth)
            }
            CrawlEvent::ArtifactEvaluated { url, decision } => match decision {
                SyncDecision::DownloadMissing => write!(f, "GET {}", url),
                SyncDecision::DownloadChanged { local, remote } => match remote {
                    Some(remote) => write!(
                        f,
                        "GET {} (local {} bytes, remote {} bytes)",
                        url, local, remote
                    ),
                    None => write!(f, "GET {} (local {} bytes, remote size unknown)", url, local),
                },
                SyncDecision::Skip { size } => {
                    write!(f, "Skipping {} (up to date, {} bytes)", url, size)
                }
            },
            CrawlEvent::ArtifactDownloaded { path, bytes, .. } => {
                write!(f, "Saved {} ({} bytes)", path.display(), bytes)
            }
            CrawlEvent::Error { url, message } => write!(f, "Error {}: {}", url, message),
        }
    }
}
