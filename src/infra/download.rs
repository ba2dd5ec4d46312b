//! Archive retrieval
//!
//! An archive is fetched with one GET, streamed to disk and hashed on the
//! way. When the transfer fails or the bytes do not match the registry's
//! sha256, nothing is left at the destination.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;

/// Receives `(bytes_received, content_length)`; the length is 0 when unknown
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// An archive written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub bytes: u64,
    /// Lowercase hex sha256 of the written bytes
    pub sha256: String,
}

/// HTTP client for source archives
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: reqwest::Client,
}

impl ArchiveClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to a default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self { http }
    }

    /// Fetch `url` into `dest`, checking it against `expected_sha256` if given
    ///
    /// The comparison ignores hex case. On any error `dest` is removed.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        progress: Option<ProgressCallback>,
    ) -> Result<FetchedArchive, DownloadError> {
        let outcome = self
            .stream_to_file(url, dest, progress.as_ref())
            .await
            .and_then(|fetched| match expected_sha256 {
                Some(expected) if !fetched.sha256.eq_ignore_ascii_case(expected) => {
                    Err(DownloadError::ChecksumMismatch {
                        path: dest.to_path_buf(),
                        expected: expected.to_string(),
                        actual: fetched.sha256,
                    })
                }
                _ => Ok(fetched),
            });

        if outcome.is_err() {
            discard(dest).await;
        }
        outcome
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<FetchedArchive, DownloadError> {
        let network = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };
        let io = |e: std::io::Error| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| network(e.to_string()))?;
        let content_length = response.content_length().unwrap_or(0);

        let mut file = tokio::fs::File::create(dest).await.map_err(io)?;
        let mut hasher = Sha256::new();
        let mut received = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| network(e.to_string()))?;
            file.write_all(&chunk).await.map_err(io)?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
            if let Some(report) = progress {
                report(received, content_length);
            }
        }
        file.flush().await.map_err(io)?;

        Ok(FetchedArchive {
            bytes: received,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

impl Default for ArchiveClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove {}: {e}", path.display());
        }
    }
}

/// File name an archive URL is stored under: its last path segment
pub fn archive_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Unpack a zip archive into `dest`, keeping the archive's own layout
///
/// Entries whose names would escape `dest` are rejected. Returns the number
/// of files written.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, DownloadError> {
    let extract_error = |error: String| DownloadError::ExtractFailed {
        path: archive_path.to_path_buf(),
        error,
    };
    let io_error = |path: &Path, e: std::io::Error| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let file = File::open(archive_path).map_err(|e| io_error(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| extract_error(format!("not a valid zip file: {e}")))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extract_error(format!("failed to read entry {i}: {e}")))?;

        let name = entry
            .enclosed_name()
            .ok_or_else(|| extract_error(format!("unsafe entry name '{}'", entry.name())))?;
        let dest_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path).map_err(|e| io_error(&dest_path, e))?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let mut outfile = File::create(&dest_path).map_err(|e| io_error(&dest_path, e))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| io_error(&dest_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&dest_path, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| io_error(&dest_path, e))?;
            }
        }
        written += 1;
    }

    tracing::debug!(
        "Extracted {written} files from {} to {}",
        archive_path.display(),
        dest.display()
    );
    Ok(written)
}
