// src/crawl/classify.rs
// =============================================================================
// Decides whether a URL is a page to traverse or an artifact to download.
//
// The decision only looks at the URL: the text after the last '.' in the
// final path segment, compared case-insensitively with the configured
// extension. Anything else, including URLs with no extension at all, is a
// page, so an unknown link is traversed rather than silently skipped.
// =============================================================================

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Page,
    Artifact,
}

pub fn classify(url: &Url, extension: &str) -> Classification {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match last_segment.rsplit_once('.') {
        Some((_, suffix)) if suffix.eq_ignore_ascii_case(extension) => Classification::Artifact,
        _ => Classification::Page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(url: &str) -> Classification {
        classify(&Url::parse(url).unwrap(), "torrent")
    }

    #[test]
    fn test_torrent_in_any_case_is_an_artifact() {
        assert_eq!(classify_str("http://example.test/a.torrent"), Classification::Artifact);
        assert_eq!(classify_str("http://example.test/x/B.TORRENT"), Classification::Artifact);
        assert_eq!(
            classify_str("http://example.test/c.Torrent?dl=1"),
            Classification::Artifact
        );
    }

    #[test]
    fn test_pages() {
        assert_eq!(classify_str("http://example.test/"), Classification::Page);
        assert_eq!(classify_str("http://example.test/sub/page.html"), Classification::Page);
        assert_eq!(classify_str("http://example.test/download"), Classification::Page);
        assert_eq!(classify_str("http://example.test/a.torrent/"), Classification::Page);
        assert_eq!(classify_str("http://example.test/a.torrent.html"), Classification::Page);
        assert_eq!(classify_str("http://example.test/torrent"), Classification::Page);
    }

    #[test]
    fn test_dot_in_directory_does_not_count() {
        assert_eq!(classify_str("http://example.test/v1.torrent/list"), Classification::Page);
    }

    #[test]
    fn test_custom_extension() {
        let url = Url::parse("http://example.test/file.ISO").unwrap();
        assert_eq!(classify(&url, "iso"), Classification::Artifact);
        assert_eq!(classify(&url, "torrent"), Classification::Page);
    }
}
