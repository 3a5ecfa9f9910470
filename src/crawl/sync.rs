// src/crawl/sync.rs
// =============================================================================
// The sync policy for artifacts: is the local copy current?
//
// File size is the only signal:
// 1. destination = output_dir / basename(url path)
// 2. nothing on disk             -> download
// 3. something on disk           -> ask for the remote size
//    - same size                 -> skip
//    - different size, or the server reports no size -> download
//    - size check fails          -> error (the engine skips this artifact)
//
// Known limitation: two remote paths with the same basename map to the same
// local file. Whichever is downloaded last wins; we don't disambiguate.
// =============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::SyncError;
use crate::fetch::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// No local file yet
    DownloadMissing,
    /// Local file exists but the remote size differs or is unknown
    DownloadChanged { local: u64, remote: Option<u64> },
    /// Local file already has the remote size
    Skip { size: u64 },
}

impl SyncDecision {
    pub fn should_download(&self) -> bool {
        !matches!(self, SyncDecision::Skip { .. })
    }
}

// Where an artifact lands on disk
//
// The last non-empty path segment is percent-decoded and used as the file
// name. If decoding would produce something unsafe as a file name ("..",
// or a name containing a path separator) the raw segment is used instead.
pub fn destination_path(output_dir: &Path, url: &Url) -> Result<PathBuf, SyncError> {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| SyncError::NoFileName(url.to_string()))?;

    let name = match urlencoding::decode(segment) {
        Ok(decoded) if is_safe_file_name(&decoded) => decoded.into_owned(),
        _ => segment.to_string(),
    };

    if !is_safe_file_name(&name) {
        return Err(SyncError::NoFileName(url.to_string()));
    }

    Ok(output_dir.join(name))
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

// Decides whether `url` has to be (re)downloaded into `destination`
pub async fn decide(
    fetcher: &Fetcher,
    url: &Url,
    destination: &Path,
) -> Result<SyncDecision, SyncError> {
    let local = match tokio::fs::metadata(destination).await {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SyncDecision::DownloadMissing),
        Err(source) => {
            return Err(SyncError::Stat {
                path: destination.to_path_buf(),
                source,
            })
        }
    };

    tracing::debug!("HEAD {} (local copy has {} bytes)", url, local);
    let remote = fetcher.remote_size(url).await?;

    Ok(match remote {
        Some(size) if size == local => SyncDecision::Skip { size },
        _ => SyncDecision::DownloadChanged { local, remote },
    })
}
