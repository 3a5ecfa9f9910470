// src/crawl/mod.rs
// =============================================================================
// This module handles crawling a site and syncing the artifacts it links to.
//
// Submodules:
// - engine: the depth-bounded traversal loop (Crawler)
// - links: pulls raw hrefs out of HTML
// - resolve: turns hrefs into absolute, normalized URLs
// - classify: page vs. artifact, by file extension
// - sync: the size-based "do we need to download this?" policy
// - events: progress events for whoever runs the crawl
// - report: the summary returned when the crawl ends
// =============================================================================

mod classify;
mod engine;
mod events;
mod links;
mod report;
mod resolve;
mod sync;

pub use engine::Crawler;
pub use events::CrawlEvent;
pub use report::CrawlReport;
pub use sync::SyncDecision;
