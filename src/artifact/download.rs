//! Streaming artifact download with redirect handling
//!
//! Bytes go into a staging file supplied by the cache. Any failure drops
//! the staging file, which deletes it, so nothing half-written survives.

use crate::error::DownloadError;
use crate::http::{resolve_location, HttpClient, HttpRequest};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

/// Shared flag used to abort an in-flight download from another task
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives transfer progress. Called from the blocking download thread.
pub trait ProgressSink: Send + Sync {
    fn started(&self, _total: Option<u64>) {}
    fn advanced(&self, _written: u64) {}
    fn finished(&self) {}
}

struct Silent;

impl ProgressSink for Silent {}

/// A completed download still sitting at its staging path
#[derive(Debug)]
pub struct DownloadedArtifact {
    path: TempPath,
    bytes: u64,
    sha256: String,
}

impl DownloadedArtifact {
    pub(crate) fn from_staged(file: NamedTempFile, bytes: u64, sha256: String) -> Self {
        Self {
            path: file.into_temp_path(),
            bytes,
            sha256,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Lowercase hex SHA-256 of the downloaded bytes
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn verify_sha256(&self, expected: &str) -> Result<(), DownloadError> {
        if self.sha256.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(DownloadError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: self.sha256.clone(),
            })
        }
    }

    /// Rename the staged file onto `target`
    pub(crate) fn persist(self, target: &Path) -> io::Result<()> {
        self.path.persist(target).map_err(|e| e.error)
    }
}

/// Fetches assets over HTTP, walking redirects itself
pub struct Downloader {
    client: Arc<dyn HttpClient>,
    timeout: Option<Duration>,
    progress: Arc<dyn ProgressSink>,
}

impl Downloader {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            timeout: None,
            progress: Arc::new(Silent),
        }
    }

    /// Whole-transfer budget per request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Download `url` into `staging`
    pub async fn fetch(
        &self,
        url: &str,
        staging: NamedTempFile,
        cancel: &CancelFlag,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let job = Transfer {
            client: Arc::clone(&self.client),
            timeout: self.timeout,
            progress: Arc::clone(&self.progress),
            cancel: cancel.clone(),
        };
        let url = url.to_string();

        tokio::task::spawn_blocking(move || job.run(&url, staging))
            .await
            .map_err(|e| DownloadError::Transfer {
                written: 0,
                source: io::Error::other(e.to_string()),
            })?
    }
}

/// Everything the blocking thread needs
struct Transfer {
    client: Arc<dyn HttpClient>,
    timeout: Option<Duration>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
}

impl Transfer {
    fn run(
        &self,
        url: &str,
        mut staging: NamedTempFile,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let mut current = url.to_string();
        let mut visited = HashSet::new();

        let mut response = loop {
            if self.cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            if !visited.insert(current.clone()) {
                return Err(DownloadError::RedirectLoop(current));
            }

            let mut request = HttpRequest::get(&current);
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
            let response = self.client.get(&request).map_err(|e| DownloadError::Request {
                url: current.clone(),
                reason: e.to_string(),
            })?;

            if response.is_success() {
                break response;
            }
            if !response.is_redirect() {
                return Err(DownloadError::Status {
                    url: current,
                    status: response.status,
                });
            }

            let next = response
                .location
                .as_deref()
                .and_then(|location| resolve_location(&current, location))
                .ok_or_else(|| DownloadError::MissingLocation {
                    url: current.clone(),
                    status: response.status,
                })?;
            debug!(status = response.status, from = %current, to = %next, "Following redirect");
            current = next;
        };

        self.progress.started(response.content_length);
        let result = self.copy_body(&mut response.body, &mut staging, response.content_length);
        self.progress.finished();
        let (written, sha256) = result?;

        debug!(bytes = written, url = %current, "Download finished");
        Ok(DownloadedArtifact::from_staged(staging, written, sha256))
    }

    fn copy_body(
        &self,
        body: &mut dyn Read,
        staging: &mut NamedTempFile,
        expected_len: Option<u64>,
    ) -> Result<(u64, String), DownloadError> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut hasher = Sha256::new();
        let mut written = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(DownloadError::Transfer { written, source }),
            };
            staging
                .write_all(&buf[..n])
                .map_err(|source| DownloadError::Transfer { written, source })?;
            hasher.update(&buf[..n]);
            written += n as u64;
            self.progress.advanced(written);
        }

        if let Some(expected) = expected_len {
            if written != expected {
                return Err(DownloadError::Transfer {
                    written,
                    source: io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("expected {} bytes", expected),
                    ),
                });
            }
        }
        if written == 0 {
            return Err(DownloadError::EmptyBody);
        }

        staging
            .as_file()
            .sync_all()
            .map_err(|source| DownloadError::Transfer { written, source })?;

        Ok((written, hex::encode(hasher.finalize())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{FakeHttp, Reply};
    use std::sync::atomic::AtomicU64;
    use tempfile::TempDir;

    fn staging(dir: &TempDir) -> NamedTempFile {
        NamedTempFile::new_in(dir.path()).unwrap()
    }

    fn file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn fetch_writes_body_and_hash() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route("https://dl.test/a.jar", Reply::Ok(b"abc".to_vec())));
        let downloader = Downloader::new(http);

        let artifact = downloader
            .fetch("https://dl.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"abc");
        assert_eq!(artifact.bytes(), 3);
        assert_eq!(
            artifact.sha256(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(artifact.verify_sha256(&artifact.sha256().to_uppercase()).is_ok());
        assert!(matches!(
            artifact.verify_sha256("00"),
            Err(DownloadError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_follows_redirect_chain() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(
            FakeHttp::new()
                .route("https://github.test/a.jar", Reply::Redirect(302, "https://cdn.test/x/a.jar".into()))
                .route("https://cdn.test/x/a.jar", Reply::Redirect(301, "b.jar".into()))
                .route("https://cdn.test/x/b.jar", Reply::Ok(b"final".to_vec())),
        );
        let downloader = Downloader::new(http.clone());

        let artifact = downloader
            .fetch("https://github.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"final");
        assert_eq!(http.total_hits(), 3);
    }

    #[tokio::test]
    async fn fetch_rejects_redirect_loop() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(
            FakeHttp::new()
                .route("https://a.test/", Reply::Redirect(302, "https://b.test/".into()))
                .route("https://b.test/", Reply::Redirect(302, "https://a.test/".into())),
        );

        let err = Downloader::new(http)
            .fetch("https://a.test/", staging(&temp), &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::RedirectLoop(ref url) if url == "https://a.test/"));
        assert_eq!(file_count(&temp), 0);
    }

    #[tokio::test]
    async fn fetch_surfaces_status_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route("https://dl.test/a.jar", Reply::Status(404)));

        let err = Downloader::new(http)
            .fetch("https://dl.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
        assert_eq!(file_count(&temp), 0);
    }

    #[tokio::test]
    async fn redirect_without_location_fails() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route("https://dl.test/a.jar", Reply::Redirect(302, String::new())));

        let err = Downloader::new(http)
            .fetch("https://dl.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::MissingLocation { status: 302, .. }));
    }

    #[tokio::test]
    async fn broken_transfer_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(
            FakeHttp::new().route("https://dl.test/a.jar", Reply::Broken(vec![7u8; 100_000])),
        );

        let err = Downloader::new(http)
            .fetch("https://dl.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transfer { written: 100_000, .. }));
        assert_eq!(file_count(&temp), 0);
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route("https://dl.test/a.jar", Reply::Ok(Vec::new())));

        let err = Downloader::new(http)
            .fetch("https://dl.test/a.jar", staging(&temp), &CancelFlag::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::EmptyBody));
        assert_eq!(file_count(&temp), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route("https://dl.test/a.jar", Reply::Ok(b"x".to_vec())));
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = Downloader::new(http.clone())
            .fetch("https://dl.test/a.jar", staging(&temp), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
        assert_eq!(http.total_hits(), 0);
        assert_eq!(file_count(&temp), 0);
    }

    struct CancelAfterFirstChunk {
        cancel: CancelFlag,
        seen: AtomicU64,
    }

    impl ProgressSink for CancelAfterFirstChunk {
        fn advanced(&self, written: u64) {
            self.seen.store(written, Ordering::SeqCst);
            self.cancel.cancel();
        }
    }

    #[tokio::test]
    async fn cancelled_mid_transfer() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(
            FakeHttp::new().route("https://dl.test/a.jar", Reply::Ok(vec![1u8; CHUNK_SIZE * 4])),
        );
        let cancel = CancelFlag::new();
        let sink = Arc::new(CancelAfterFirstChunk {
            cancel: cancel.clone(),
            seen: AtomicU64::new(0),
        });

        let err = Downloader::new(http)
            .with_progress(sink.clone())
            .fetch("https://dl.test/a.jar", staging(&temp), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
        assert_eq!(sink.seen.load(Ordering::SeqCst), CHUNK_SIZE as u64);
        assert_eq!(file_count(&temp), 0);
    }
}
