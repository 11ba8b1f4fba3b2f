mod client;
mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::media::SelectedFile;
use crate::review::{ReviewDecision, ReviewOutcome, VideoStatus};

pub use client::BackendClient;
pub use error::{ApiError, ApiResult};

/// Body of `POST /api/upload-url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadUrlRequest {
    #[serde(rename = "nombre_archivo")]
    pub file_name: String,
    pub content_type: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    pub club_id: Option<String>,
    #[serde(rename = "duracion")]
    pub duration_seconds: f64,
}

impl UploadUrlRequest {
    pub fn for_file(file: &SelectedFile, description: &str, club_id: Option<&str>) -> Self {
        let club_id = club_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            file_name: file.name.clone(),
            content_type: file.content_type().to_string(),
            description: description.to_string(),
            club_id,
            duration_seconds: file.duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub upload_url: String,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub video_id: Option<i64>,
}

#[async_trait]
pub trait UploadUrlRequester: Send + Sync {
    async fn request_upload_url(&self, request: &UploadUrlRequest) -> ApiResult<UploadTarget>;
}

#[async_trait]
pub trait PlaybackUrlSource: Send + Sync {
    /// `Ok(None)` when the backend answered without a usable url.
    async fn signed_playback_url(&self, video_id: i64) -> ApiResult<Option<String>>;
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_statuses(&self, ids: &[i64]) -> ApiResult<Vec<VideoStatus>>;
}

#[async_trait]
pub trait ReviewActions: Send + Sync {
    async fn review(&self, video_id: i64, decision: ReviewDecision) -> ApiResult<ReviewOutcome>;
}
