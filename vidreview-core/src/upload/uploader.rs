use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::media::SelectedFile;

use super::progress::ProgressTracker;

pub type UploadResult<T> = Result<T, UploadError>;

/// Receives integer percentages (0-100) as the body is sent.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload rejected with HTTP status {0}")]
    UploadRejected(u16),
    #[error("network failure during upload: {0}")]
    UploadNetworkError(String),
    #[error("failed to read {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Sends a whole file to a signed storage URL in one request. A failed
/// transfer has to be started again from zero.
#[async_trait]
pub trait DirectUploader: Send + Sync {
    async fn upload(
        &self,
        target_url: &str,
        file: &SelectedFile,
        progress: ProgressCallback,
    ) -> UploadResult<()>;
}

#[derive(Clone)]
pub struct HttpUploader {
    http: Client,
}

impl fmt::Debug for HttpUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUploader").finish_non_exhaustive()
    }
}

impl HttpUploader {
    /// Only the connection phase is bounded; a large body may take as long
    /// as it needs.
    pub fn new(connect_timeout: Duration) -> UploadResult<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| UploadError::UploadNetworkError(err.to_string()))?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DirectUploader for HttpUploader {
    async fn upload(
        &self,
        target_url: &str,
        file: &SelectedFile,
        progress: ProgressCallback,
    ) -> UploadResult<()> {
        let io_error = |source| UploadError::Io {
            source,
            path: file.path.clone(),
        };
        let handle = File::open(&file.path).await.map_err(io_error)?;
        let total = handle.metadata().await.map_err(io_error)?.len();

        let tracker = Arc::new(Mutex::new(ProgressTracker::new(total)));
        if let Some(percent) = lock(&tracker).advance(0) {
            progress(percent);
        }

        let stream_tracker = Arc::clone(&tracker);
        let stream_progress = Arc::clone(&progress);
        let stream = ReaderStream::new(handle).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let reported = lock(&stream_tracker).advance(bytes.len() as u64);
                if let Some(percent) = reported {
                    stream_progress(percent);
                }
            }
            chunk
        });

        debug!(file = %file.name, bytes = total, "starting direct upload");
        let response = self
            .http
            .put(target_url)
            .header(CONTENT_TYPE, file.content_type())
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|err| {
                warn!(file = %file.name, error = %err, "direct upload failed in transit");
                UploadError::UploadNetworkError(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(file = %file.name, status = status.as_u16(), "storage rejected upload");
            return Err(UploadError::UploadRejected(status.as_u16()));
        }

        let finished = lock(&tracker).finish();
        if let Some(percent) = finished {
            progress(percent);
        }
        info!(file = %file.name, bytes = total, "direct upload finished");
        Ok(())
    }
}

fn lock(tracker: &Mutex<ProgressTracker>) -> std::sync::MutexGuard<'_, ProgressTracker> {
    tracker
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
