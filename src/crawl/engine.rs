// src/crawl/engine.rs
// =============================================================================
// The depth-bounded traversal engine.
//
// How it works:
// 1. Start with the root URL in a queue at depth 0
// 2. Pop a target; skip it if its URL was already visited, else mark it
// 3. Artifact URLs go through the sync policy (maybe download)
// 4. Page URLs are fetched; while depth < max_depth their links are
//    resolved and queued at depth + 1
// 5. Repeat until the queue is empty (or the crawl is cancelled)
//
// The queue and the visited set are plain locals of run(). Visits run as
// futures in a FuturesUnordered (at most `parallelism` at a time) and hand
// their discovered links back to the loop, so only the loop ever touches the
// visited set and checking + marking a URL happens in one step.
//
// Termination: every queued target is one hop deeper than the page it was
// found on and nothing deeper than max_depth is queued; the visited set
// breaks cycles.
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::classify::{classify, Classification};
use super::events::CrawlEvent;
use super::links::extract_links;
use super::report::{CrawlFailure, CrawlReport};
use super::resolve::{effective_base, normalize, resolve};
use super::sync::{decide, destination_path};
use crate::config::CrawlConfig;
use crate::error::{ConfigError, FetchError, SyncError};
use crate::fetch::{Fetcher, Page};

// A URL waiting to be visited, and how many hops it is from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    pub depth: usize,
}

// The mutable half of a crawl: the work queue and the visited set
#[derive(Debug)]
struct CrawlState {
    queue: VecDeque<CrawlTarget>,
    visited: HashSet<String>,
}

impl CrawlState {
    fn new(root: Url) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(CrawlTarget {
            url: normalize(root),
            depth: 0,
        });
        Self {
            queue,
            visited: HashSet::new(),
        }
    }

    // Marks a URL visited; false if it already was
    fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.as_str().to_string())
    }

    fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }
}

// How a single visit ended
#[derive(Debug)]
enum Outcome {
    Page { final_url: Url, links: Vec<Url> },
    Downloaded { path: PathBuf },
    UpToDate,
    Failed(String),
    Cancelled,
}

#[derive(Debug)]
struct Visit {
    target: CrawlTarget,
    outcome: Outcome,
}

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    cancel: CancellationToken,
    events: Option<UnboundedSender<CrawlEvent>>,
}

impl Crawler {
    // Validates the config and builds the HTTP client
    pub fn new(config: CrawlConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let fetcher = Fetcher::new(&config, cancel.clone())
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            config,
            fetcher,
            cancel,
            events: None,
        })
    }

    // Sends progress events to `events` while the crawl runs
    pub fn with_events(mut self, events: UnboundedSender<CrawlEvent>) -> Self {
        self.events = Some(events);
        self
    }

    // A handle that stops the crawl when cancelled
    //
    // No new visit starts once it is cancelled. Visits already in flight
    // stop at whatever they are waiting on (host delay, response headers,
    // body chunks), so a stalled server can't hold the crawl open.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    // Runs the crawl to completion and reports what happened
    pub async fn run(&self) -> CrawlReport {
        let mut state = CrawlState::new(self.config.root_url.clone());
        let mut report = CrawlReport::default();
        let mut in_flight = FuturesUnordered::new();

        tracing::info!(
            root = %self.config.root_url,
            max_depth = self.config.max_depth,
            output_dir = %self.config.output_dir.display(),
            delay = ?self.config.request_delay,
            "Starting crawl"
        );

        loop {
            while in_flight.len() < self.config.parallelism {
                if self.cancel.is_cancelled() {
                    break;
                }
                let Some(target) = state.queue.pop_front() else {
                    break;
                };
                if !state.mark_visited(&target.url) {
                    tracing::debug!("Skipping already visited URL: {}", target.url);
                    continue;
                }
                report.visited += 1;
                in_flight.push(self.visit(target));
            }

            match in_flight.next().await {
                Some(visit) => self.record(visit, &mut state, &mut report),
                None => break,
            }
        }

        report.cancelled = self.cancel.is_cancelled();
        tracing::info!(
            visited = report.visited,
            downloaded = report.downloaded.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Crawl finished"
        );

        report
    }

    async fn visit(&self, target: CrawlTarget) -> Visit {
        let outcome = match classify(&target.url, &self.config.artifact_extension) {
            Classification::Page => self.visit_page(&target).await,
            Classification::Artifact => self.visit_artifact(&target).await,
        };
        Visit { target, outcome }
    }

    async fn visit_page(&self, target: &CrawlTarget) -> Outcome {
        self.emit(CrawlEvent::PageVisited {
            url: target.url.clone(),
            depth: target.depth,
        });
        tracing::debug!(depth = target.depth, "Fetching page {}", target.url);

        let page = match self.fetcher.get_page(&target.url).await {
            Ok(page) => page,
            Err(FetchError::Cancelled(_)) => return Outcome::Cancelled,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        tracing::debug!(
            status = %page.status,
            length = ?page.content_length,
            content_type = ?page.content_type,
            "Fetched {}",
            page.final_url
        );

        let links = if target.depth < self.config.max_depth && page.is_html() {
            self.discover_links(&page)
        } else {
            Vec::new()
        };

        Outcome::Page {
            final_url: normalize(page.final_url),
            links,
        }
    }

    // Resolves every link on the page; links that don't resolve are dropped
    fn discover_links(&self, page: &Page) -> Vec<Url> {
        let extracted = extract_links(&page.body);
        let base = effective_base(&page.final_url, extracted.base.as_deref());

        let links: Vec<Url> = extracted
            .hrefs
            .iter()
            .filter_map(|href| match resolve(&base, href) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::trace!("Dropping link '{}' on {}: {}", href, page.final_url, e);
                    None
                }
            })
            .filter(|url| {
                !self.config.same_host_only || url.host_str() == self.config.root_url.host_str()
            })
            .collect();

        tracing::debug!("Found {} links on {}", links.len(), page.final_url);
        links
    }

    async fn visit_artifact(&self, target: &CrawlTarget) -> Outcome {
        let destination = match destination_path(&self.config.output_dir, &target.url) {
            Ok(path) => path,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        let decision = match decide(&self.fetcher, &target.url, &destination).await {
            Ok(decision) => decision,
            Err(SyncError::Fetch(FetchError::Cancelled(_))) => return Outcome::Cancelled,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        self.emit(CrawlEvent::ArtifactEvaluated {
            url: target.url.clone(),
            decision: decision.clone(),
        });
        if !decision.should_download() {
            return Outcome::UpToDate;
        }

        match self.fetcher.download(&target.url, &destination).await {
            Ok(bytes) => {
                tracing::debug!("Wrote {} bytes to {}", bytes, destination.display());
                self.emit(CrawlEvent::ArtifactDownloaded {
                    url: target.url.clone(),
                    path: destination.clone(),
                    bytes,
                });
                Outcome::Downloaded { path: destination }
            }
            Err(FetchError::Cancelled(_)) => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    // Folds a finished visit back into the crawl state
    fn record(&self, visit: Visit, state: &mut CrawlState, report: &mut CrawlReport) {
        let Visit { target, outcome } = visit;

        match outcome {
            Outcome::Page { final_url, links } => {
                report.pages += 1;
                // A redirect target has been fetched too; don't fetch it again
                state.mark_visited(&final_url);

                for url in links {
                    if !state.is_visited(&url) {
                        state.queue.push_back(CrawlTarget {
                            url,
                            depth: target.depth + 1,
                        });
                    }
                }
            }
            Outcome::Downloaded { path } => report.downloaded.push(path),
            Outcome::UpToDate => report.skipped += 1,
            Outcome::Failed(message) => {
                tracing::warn!("Failed to process {}: {}", target.url, message);
                self.emit(CrawlEvent::Error {
                    url: target.url.to_string(),
                    message: message.clone(),
                });
                report.failures.push(CrawlFailure {
                    url: target.url.to_string(),
                    message,
                });
            }
            Outcome::Cancelled => {
                tracing::debug!("Visit of {} cancelled", target.url);
            }
        }
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine
            let _ = events.send(event);
        }
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why FuturesUnordered instead of tokio::spawn?
//    - The visits borrow &self (config, fetcher), so they can't be 'static
//    - FuturesUnordered polls them all on the current task and yields each
//      Visit as soon as it completes, in whatever order that happens
//    - With parallelism = 1 there's only ever one future in it, which gives
//      the plain one-request-at-a-time crawl
//
// 2. Why is order not part of the contract?
//    - With parallelism > 1 results come back out of order, so the queue is
//      no longer strictly breadth-first
//    - Coverage is still the same: a URL is visited at most once, and only
//      links found on pages shallower than max_depth are followed
//
// 3. What does `let Some(x) = ... else { break };` do?
//    - let-else: bind x if the pattern matches, otherwise run the else block
//      (which must leave the scope with break/continue/return)
//
// 4. Can a redirect target be fetched twice?
//    - Yes, with parallelism > 1. A redirect target is only marked visited in
//      record(), once its page is done. Two in-flight pages that redirect to
//      the same URL (or one that redirects to a URL already queued) each
//      fetch it, and its links get queued by both
//    - The visited set still dedupes those links, so the extra cost is one
//      GET per collision. With the default parallelism = 1 it can't happen
// -----------------------------------------------------------------------------
