use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, LOCATION};
use reqwest::{redirect, Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::review::{ReviewDecision, ReviewOutcome, ReviewReceipt, VideoStatus};

use super::error::{ApiError, ApiResult};
use super::{
    PlaybackUrlSource, ReviewActions, StatusSource, UploadTarget, UploadUrlRequest,
    UploadUrlRequester,
};

const USER_ID_HEADER: &str = "X-User-Id";

/// HTTP client for the review backend.
///
/// Redirects are never followed: review actions report a redirect as
/// [`ReviewOutcome::Redirected`] instead.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base: Url,
    user_id: Option<String>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base", &self.base.as_str())
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl BackendClient {
    pub fn new(base: Url, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(http, base))
    }

    /// `base` may carry a path prefix; every endpoint is resolved below it.
    pub fn with_client(http: Client, base: Url) -> Self {
        Self {
            http,
            base: as_directory(base),
            user_id: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let base = Url::parse(&config.server.base_url)?;
        let client = Self::new(base, config.server.request_timeout())?;
        Ok(client.with_user_id(config.server.user_id.clone()))
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(user_id) => builder.header(USER_ID_HEADER, user_id),
            None => builder,
        }
    }

    pub async fn request_upload_url(&self, request: &UploadUrlRequest) -> ApiResult<UploadTarget> {
        let url = self.endpoint("/api/upload-url")?;
        debug!(file = %request.file_name, duration = request.duration_seconds, "requesting upload url");
        let response = self
            .decorate(self.http.post(url))
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let target: UploadTarget = response.json().await?;
        if target.upload_url.trim().is_empty() {
            return Err(ApiError::Decode("response carries an empty upload_url".into()));
        }
        info!(
            object = target.object_name.as_deref().unwrap_or("-"),
            video_id = ?target.video_id,
            "received signed upload url"
        );
        Ok(target)
    }

    pub async fn signed_playback_url(&self, video_id: i64) -> ApiResult<Option<String>> {
        let url = self.endpoint(&format!("/admin/videos/{video_id}/signed-url"))?;
        let response = self
            .decorate(self.http.get(url))
            .query(&[("ts", cache_buster().to_string())])
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: SignedUrlResponse = response.json().await?;
        Ok(body.url.filter(|url| !url.trim().is_empty()))
    }

    pub async fn review(&self, video_id: i64, decision: ReviewDecision) -> ApiResult<ReviewOutcome> {
        let url = self.endpoint(&format!(
            "/admin/videos/{video_id}/{}",
            decision.path_segment()
        ))?;
        let response = self.decorate(self.http.post(url)).send().await?;
        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            info!(video_id, ?decision, "review applied, backend redirected");
            return Ok(ReviewOutcome::Redirected { location });
        }
        if status.is_success() {
            info!(video_id, ?decision, "review applied");
            return Ok(ReviewOutcome::Applied(ReviewReceipt::new(
                video_id,
                decision,
                Utc::now(),
            )));
        }
        let reason = error_reason(response)
            .await
            .unwrap_or_else(|| decision.default_failure().to_string());
        warn!(video_id, ?decision, status = status.as_u16(), %reason, "review rejected");
        Err(ApiError::ServerRejected {
            status: status.as_u16(),
            reason: Some(reason),
        })
    }

    pub async fn fetch_statuses(&self, ids: &[i64]) -> ApiResult<Vec<VideoStatus>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.endpoint("/admin/videos/status")?;
        let response = self
            .decorate(self.http.get(url))
            .query(&[("ids", joined)])
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: StatusResponse = response.json().await?;
        Ok(body.videos)
    }
}

#[async_trait]
impl UploadUrlRequester for BackendClient {
    async fn request_upload_url(&self, request: &UploadUrlRequest) -> ApiResult<UploadTarget> {
        BackendClient::request_upload_url(self, request).await
    }
}

#[async_trait]
impl PlaybackUrlSource for BackendClient {
    async fn signed_playback_url(&self, video_id: i64) -> ApiResult<Option<String>> {
        BackendClient::signed_playback_url(self, video_id).await
    }
}

#[async_trait]
impl StatusSource for BackendClient {
    async fn fetch_statuses(&self, ids: &[i64]) -> ApiResult<Vec<VideoStatus>> {
        BackendClient::fetch_statuses(self, ids).await
    }
}

#[async_trait]
impl ReviewActions for BackendClient {
    async fn review(&self, video_id: i64, decision: ReviewDecision) -> ApiResult<ReviewOutcome> {
        BackendClient::review(self, video_id, decision).await
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    videos: Vec<VideoStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let reason = error_reason(response).await;
    Err(ApiError::ServerRejected {
        status: status.as_u16(),
        reason,
    })
}

async fn error_reason(response: Response) -> Option<String> {
    let body = response.bytes().await.ok()?;
    let parsed: ErrorResponse = serde_json::from_slice(&body).ok()?;
    parsed.error.filter(|reason| !reason.trim().is_empty())
}

/// Drops query and fragment and ensures a trailing slash, so relative joins
/// keep the path prefix.
fn as_directory(mut base: Url) -> Url {
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
