// src/fetch/mod.rs
// =============================================================================
// Everything that touches the network.
//
// Submodules:
// - http: the Fetcher (pages, size checks, downloads)
// - politeness: per-host pacing that every request goes through
// =============================================================================

mod http;
mod politeness;

pub use http::{Fetcher, Page};
