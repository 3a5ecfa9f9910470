// src/crawl/resolve.rs
// =============================================================================
// Turns hrefs into absolute, normalized URLs.
//
// Resolution follows the standard relative-URL rules (Url::join does the
// heavy lifting). Normalization gives every URL a single spelling so the
// visited set can compare them:
// - scheme and host lowercased, default port dropped, dot segments removed,
//   empty path becomes "/" (all done by the url crate when parsing)
// - the #fragment is removed (it never changes what the server returns)
// - an empty "?" is removed
//
// Only http and https links survive. Everything else (mailto:, javascript:,
// data:, ...) is reported as an error, which the engine quietly drops.
// =============================================================================

use url::Url;

use crate::error::ResolveError;

// Resolves an href found on a page whose effective base is `base`
//
// Examples:
//   base = "http://example.test/sub/page.html"
//   href = "../a.torrent"          -> "http://example.test/a.torrent"
//   href = "/"                     -> "http://example.test/"
//   href = "HTTP://Other.test#top" -> "http://other.test/"
//   href = "mailto:me@example.test"-> Err(UnsupportedScheme)
pub fn resolve(base: &Url, href: &str) -> Result<Url, ResolveError> {
    let url = base.join(href.trim()).map_err(|e| ResolveError::Malformed {
        href: href.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(normalize(url)),
        other => Err(ResolveError::UnsupportedScheme(other.to_string())),
    }
}

// Picks the URL relative links on a page are resolved against
//
// A <base href> wins when it resolves to an http(s) URL; otherwise the
// page's own (post-redirect) URL is used.
pub fn effective_base(page_url: &Url, base_href: Option<&str>) -> Url {
    base_href
        .and_then(|href| resolve(page_url, href).ok())
        .unwrap_or_else(|| page_url.clone())
}

// Canonical form used as the visited-set key
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}
