// src/fetch/http.rs
// =============================================================================
// The HTTP side of the crawl: fetching pages, checking artifact sizes, and
// downloading artifacts to disk.
//
// Key functionality:
// - One shared reqwest Client (connection pooling, default redirect policy)
// - Every request is paced through Politeness first
// - Size checks use HEAD and fall back to GET when HEAD gives no length
// - Every wait (host delay, headers, body chunks) ends early on cancellation
// - Downloads stream into "<name>.part" and are renamed into place only
//   once the whole body has arrived
//
// Nothing here retries. A failed request is returned to the engine, which
// records it and carries on with the rest of the queue.
// =============================================================================

use std::future::Future;
use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::politeness::Politeness;
use crate::config::CrawlConfig;
use crate::error::FetchError;

// A fetched page
//
// `final_url` is where redirects ended up; links on the page are resolved
// against it. `body` is left empty when the response is not HTML.
#[derive(Debug, Clone)]
pub struct Page {
    pub final_url: Url,
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    // Pages without a Content-Type are parsed anyway
    pub fn is_html(&self) -> bool {
        is_html_content_type(self.content_type.as_deref())
    }
}

pub struct Fetcher {
    client: Client,
    politeness: Politeness,
    cancel: CancellationToken,
}

impl Fetcher {
    // Builds the shared client from the crawl configuration
    //
    // Redirects use reqwest's default policy (follow up to 10 hops).
    pub fn new(config: &CrawlConfig, cancel: CancellationToken) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(format!("torrent-harvest/{}", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            politeness: Politeness::new(config.request_delay, config.parallelism),
            cancel,
        })
    }

    // GETs a page and reads its body if it is HTML
    pub async fn get_page(&self, url: &Url) -> Result<Page, FetchError> {
        let _guard = self.politeness.acquire(url, &self.cancel).await?;

        let response = self
            .cancellable(url, self.client.get(url.clone()).send())
            .await?;

        let final_url = response.url().clone();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: final_url.to_string(),
                status,
            });
        }

        let content_length = header_length(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = if is_html_content_type(content_type.as_deref()) {
            self.cancellable(&final_url, response.text()).await?
        } else {
            String::new()
        };

        Ok(Page {
            final_url,
            status,
            content_length,
            content_type,
            body,
        })
    }

    // Asks the server how big a resource is without downloading it
    //
    // Returns:
    //   Ok(Some(n)) = server reported n bytes
    //   Ok(None)    = server answered but gave no usable length
    //   Err(..)     = transport failure (or cancelled)
    pub async fn remote_size(&self, url: &Url) -> Result<Option<u64>, FetchError> {
        {
            let _guard = self.politeness.acquire(url, &self.cancel).await?;
            let head = self
                .cancellable(url, self.client.head(url.clone()).send())
                .await?;

            if head.status().is_success() {
                if let Some(length) = header_length(head.headers()) {
                    return Ok(Some(length));
                }
            }
            tracing::debug!(
                "HEAD {} gave no length (HTTP {}), falling back to GET",
                url,
                head.status()
            );
        }

        let _guard = self.politeness.acquire(url, &self.cancel).await?;
        let response = self
            .cancellable(url, self.client.get(url.clone()).send())
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        // Dropping the response here closes it without reading the body
        Ok(header_length(response.headers()))
    }

    // Downloads `url` into `destination`, replacing whatever is there
    //
    // Returns the number of bytes written. On any failure the partial file
    // is removed and `destination` is left untouched.
    pub async fn download(&self, url: &Url, destination: &Path) -> Result<u64, FetchError> {
        // Held until the file is in place, so the host delay starts after the body
        let _guard = self.politeness.acquire(url, &self.cancel).await?;

        let mut response = self
            .cancellable(url, self.client.get(url.clone()).send())
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let partial = partial_path(destination);
        let written = match self.write_body(url, &mut response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(source) = tokio::fs::rename(&partial, destination).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(FetchError::Io {
                path: destination.to_path_buf(),
                source,
            });
        }

        Ok(written)
    }

    async fn write_body(
        &self,
        url: &Url,
        response: &mut reqwest::Response,
        partial: &Path,
    ) -> Result<u64, FetchError> {
        let io_error = |source| FetchError::Io {
            path: partial.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(partial).await.map_err(io_error)?;
        let mut written = 0u64;

        while let Some(chunk) = self.cancellable(url, response.chunk()).await? {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_error)?;
        Ok(written)
    }

    // Runs one network step, giving up as soon as the crawl is cancelled.
    // A stalled server would otherwise hold the crawl until the timeout,
    // and there is no timeout unless --timeout is given.
    async fn cancellable<T, F>(&self, url: &Url, step: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, reqwest::Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled(url.to_string())),
            result = step => result.map_err(|e| transport(url, e)),
        }
    }
}

fn transport(url: &Url, source: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        source,
    }
}

// Reads Content-Length straight from the headers.
// Response::content_length() reports the body size hint, which is 0 for HEAD.
fn header_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => value.to_ascii_lowercase().contains("html"),
        None => true,
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn fetcher(server: &MockServer) -> Fetcher {
        let config = CrawlConfig::new(&server.url("/"), "unused")
            .unwrap()
            .with_request_delay(Duration::ZERO);
        Fetcher::new(&config, CancellationToken::new()).unwrap()
    }

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&server.url(path)).unwrap()
    }

    fn fetcher_for(url: &Url, cancel: CancellationToken) -> Fetcher {
        let config = CrawlConfig::new(url.as_str(), "unused")
            .unwrap()
            .with_request_delay(Duration::ZERO);
        Fetcher::new(&config, cancel).unwrap()
    }

    // Answers one request with a 200 that promises 1000 bytes, sends the
    // first 100, waits `hold`, then hangs up
    async fn short_body_server(hold: Duration) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&[9u8; 100]).await.unwrap();
            socket.flush().await.unwrap();

            tokio::time::sleep(hold).await;
        });

        Url::parse(&format!("http://{}/cut.torrent", addr)).unwrap()
    }

    #[test]
    fn test_header_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_length(&headers), None);

        headers.insert(CONTENT_LENGTH, "200".parse().unwrap());
        assert_eq!(header_length(&headers), Some(200));

        headers.insert(CONTENT_LENGTH, "lots".parse().unwrap());
        assert_eq!(header_length(&headers), None);
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type(None));
        assert!(is_html_content_type(Some("text/html; charset=utf-8")));
        assert!(is_html_content_type(Some("application/xhtml+xml")));
        assert!(!is_html_content_type(Some("application/x-bittorrent")));
    }

    #[test]
    fn test_partial_path_sits_next_to_destination() {
        let partial = partial_path(Path::new("/tmp/out/a.torrent"));
        assert_eq!(partial, PathBuf::from("/tmp/out/a.torrent.part"));
    }

    #[tokio::test]
    async fn test_get_page_reads_html() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/index.html");
                then.status(200)
                    .header("content-type", "text/html")
                    .body("<a href=\"/a.torrent\">a</a>");
            })
            .await;

        let page = fetcher(&server)
            .get_page(&url(&server, "/index.html"))
            .await
            .unwrap();

        assert!(page.is_html());
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("a.torrent"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_page_skips_non_html_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/logo.png");
                then.status(200).header("content-type", "image/png").body("PNG");
            })
            .await;

        let page = fetcher(&server)
            .get_page(&url(&server, "/logo.png"))
            .await
            .unwrap();

        assert!(!page.is_html());
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_get_page_reports_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let err = fetcher(&server)
            .get_page(&url(&server, "/missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_size_check_falls_back_to_get_length() {
        let server = MockServer::start_async().await;
        // No HEAD mock, so HEAD gets a 404 and the size check retries with GET
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a.torrent");
                then.status(200).body(vec![7u8; 100]);
            })
            .await;

        let size = fetcher(&server)
            .remote_size(&url(&server, "/a.torrent"))
            .await
            .unwrap();

        assert_eq!(size, Some(100));
    }

    #[tokio::test]
    async fn test_size_of_missing_resource_is_unknown() {
        let server = MockServer::start_async().await;

        let size = fetcher(&server)
            .remote_size(&url(&server, "/gone.torrent"))
            .await
            .unwrap();

        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_size_check_transport_failure_is_an_error() {
        let config = CrawlConfig::new("http://127.0.0.1:1/", "unused")
            .unwrap()
            .with_request_delay(Duration::ZERO);
        let fetcher = Fetcher::new(&config, CancellationToken::new()).unwrap();

        let err = fetcher
            .remote_size(&Url::parse("http://127.0.0.1:1/a.torrent").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_download_writes_whole_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/b.torrent");
                then.status(200).body(vec![1u8; 200]);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("b.torrent");
        std::fs::write(&destination, b"stale").unwrap();

        let written = fetcher(&server)
            .download(&url(&server, "/b.torrent"), &destination)
            .await
            .unwrap();

        assert_eq!(written, 200);
        assert_eq!(std::fs::metadata(&destination).unwrap().len(), 200);
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.torrent");
                then.status(500);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("broken.torrent");

        let result = fetcher(&server)
            .download(&url(&server, "/broken.torrent"), &destination)
            .await;

        assert!(result.is_err());
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_cancelled_fetcher_sends_nothing() {
        let server = MockServer::start_async().await;
        let config = CrawlConfig::new(&server.url("/"), "unused")
            .unwrap()
            .with_request_delay(Duration::ZERO);
        let cancel = CancellationToken::new();
        let fetcher = Fetcher::new(&config, cancel.clone()).unwrap();

        cancel.cancel();
        let err = fetcher.get_page(&url(&server, "/")).await.unwrap_err();

        assert!(matches!(err, FetchError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_no_file() {
        let url = short_body_server(Duration::ZERO).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("cut.torrent");

        let err = fetcher_for(&url, CancellationToken::new())
            .download(&url, &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_truncated_body_keeps_previous_copy() {
        let url = short_body_server(Duration::ZERO).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("cut.torrent");
        std::fs::write(&destination, b"previous").unwrap();

        let result = fetcher_for(&url, CancellationToken::new())
            .download(&url, &destination)
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&destination).unwrap(), b"previous");
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_a_stalled_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow.torrent");
                then.status(200).delay(Duration::from_secs(5)).body("late");
            })
            .await;

        let cancel = CancellationToken::new();
        let url = url(&server, "/slow.torrent");
        let fetcher = fetcher_for(&url, cancel.clone());
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("slow.torrent");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = fetcher.download(&url, &destination).await.unwrap_err();

        assert!(matches!(err, FetchError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_a_stalled_body() {
        let url = short_body_server(Duration::from_secs(10)).await;
        let cancel = CancellationToken::new();
        let fetcher = fetcher_for(&url, cancel.clone());
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("cut.torrent");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = fetcher.download(&url, &destination).await.unwrap_err();

        assert!(matches!(err, FetchError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }
}
