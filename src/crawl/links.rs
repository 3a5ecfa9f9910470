// src/crawl/links.rs
// =============================================================================
// This module pulls the raw links out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (even broken, real-world HTML)
// - Supports CSS selectors for finding elements
//
// Only the raw href strings are returned, in document order. Turning them
// into absolute URLs is resolve.rs's job, so this stays a pure function of
// the page text.
// =============================================================================

use scraper::{Html, Selector};

// The links found on one page
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageLinks {
    /// The page's <base href>, if it declares one
    pub base: Option<String>,
    /// Every <a href> value, in document order (duplicates kept)
    pub hrefs: Vec<String>,
}

// Extracts <a href> values (and the <base href>) from an HTML document
//
// Example:
//   html = "<a href='/a.torrent'>A</a><a href='sub/'>Sub</a>"
//   result.hrefs = ["/a.torrent", "sub/"]
pub fn extract_links(html: &str) -> PageLinks {
    let mut links = PageLinks::default();
    if html.trim().is_empty() {
        return links;
    }

    let document = Html::parse_document(html);

    // Both selectors are constants, so parsing them cannot fail
    let anchor = Selector::parse("a[href]").expect("valid 'a[href]' selector");
    let base = Selector::parse("base[href]").expect("valid 'base[href]' selector");

    // Only the first <base> counts, like in a browser
    links.base = document
        .select(&base)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    for element in document.select(&anchor) {
        if let Some(href) = element.value().attr("href") {
            links.hrefs.push(href.trim().to_string());
        }
    }

    links
}
