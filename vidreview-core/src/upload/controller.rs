use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, UploadTarget, UploadUrlRequest, UploadUrlRequester};
use crate::config::DEFAULT_SUCCESS_REDIRECT;
use crate::media::{DurationProber, Rejection, SelectedFile, Validation, VideoFileValidator};

use super::uploader::{DirectUploader, ProgressCallback, UploadError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Validating,
    ProbingDuration,
    RequestingUrl,
    Uploading { percent: u8 },
    Succeeded { redirect: String },
    Failed { reason: String },
}

impl SubmissionState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SubmissionState::Validating
                | SubmissionState::ProbingDuration
                | SubmissionState::RequestingUrl
                | SubmissionState::Uploading { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(Rejection),
    #[error("signed url request failed: {0}")]
    Request(#[from] ApiError),
    #[error("direct upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(rejection) => rejection.to_string(),
            SubmitError::Request(error) => error.user_message(),
            SubmitError::Upload(_) => {
                "Ocurrió un error subiendo el video. Intenta de nuevo.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub description: String,
    pub club_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    /// Where the user is sent once the upload is stored.
    pub redirect: String,
    pub file_name: String,
    pub bytes: u64,
    pub duration_seconds: f64,
    pub object_name: Option<String>,
    pub video_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "submission", rename_all = "snake_case")]
pub enum Submission {
    Completed(UploadReceipt),
    /// Another submission was already in flight; nothing was sent.
    Ignored,
}

/// Held for the lifetime of one submission; dropping it reopens the gate.
struct SubmissionToken {
    flag: Arc<AtomicBool>,
}

impl SubmissionToken {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for SubmissionToken {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives validate → probe → request url → upload for one selected file at a
/// time.
pub struct UploadController {
    validator: VideoFileValidator,
    prober: Arc<dyn DurationProber>,
    requester: Arc<dyn UploadUrlRequester>,
    uploader: Arc<dyn DirectUploader>,
    success_redirect: String,
    observer: Option<ProgressCallback>,
    in_flight: Arc<AtomicBool>,
    state: Arc<watch::Sender<SubmissionState>>,
}

impl fmt::Debug for UploadController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadController")
            .field("validator", &self.validator)
            .field("success_redirect", &self.success_redirect)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl UploadController {
    pub fn new(
        validator: VideoFileValidator,
        prober: Arc<dyn DurationProber>,
        requester: Arc<dyn UploadUrlRequester>,
        uploader: Arc<dyn DirectUploader>,
    ) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            validator,
            prober,
            requester,
            uploader,
            success_redirect: DEFAULT_SUCCESS_REDIRECT.to_string(),
            observer: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            state: Arc::new(state),
        }
    }

    pub fn with_success_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.success_redirect = redirect.into();
        self
    }

    /// Called with every forward step of the upload percentage.
    pub fn with_progress_observer(mut self, observer: ProgressCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(
        &self,
        file: Option<SelectedFile>,
        form: &UploadForm,
    ) -> Result<Submission, SubmitError> {
        let Some(_token) = SubmissionToken::acquire(&self.in_flight) else {
            debug!("submission already in flight, ignoring");
            return Ok(Submission::Ignored);
        };

        match self.run(file, form).await {
            Ok(receipt) => {
                self.transition(SubmissionState::Succeeded {
                    redirect: receipt.redirect.clone(),
                });
                Ok(Submission::Completed(receipt))
            }
            Err(error) => {
                warn!(error = %error, "upload submission failed");
                // stays published until the next submission starts validating
                self.transition(SubmissionState::Failed {
                    reason: error.user_message(),
                });
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        file: Option<SelectedFile>,
        form: &UploadForm,
    ) -> Result<UploadReceipt, SubmitError> {
        self.transition(SubmissionState::Validating);
        let mut file = file.ok_or(SubmitError::Validation(Rejection::NoFileSelected))?;
        if let Validation::Rejected(rejection) = self.validator.validate_file(&file) {
            return Err(SubmitError::Validation(rejection));
        }

        if !file.has_duration() {
            self.transition(SubmissionState::ProbingDuration);
            file.duration_seconds = self.prober.probe(&file.path).await;
        }

        self.transition(SubmissionState::RequestingUrl);
        let request = UploadUrlRequest::for_file(
            &file,
            &form.description,
            form.club_id.as_deref(),
        );
        let target = self.requester.request_upload_url(&request).await?;

        self.transition(SubmissionState::Uploading { percent: 0 });
        self.uploader
            .upload(&target.upload_url, &file, self.progress_callback())
            .await?;

        info!(
            file = %file.name,
            bytes = file.size,
            duration = file.duration_seconds,
            "video stored"
        );
        Ok(self.receipt(file, target))
    }

    fn progress_callback(&self) -> ProgressCallback {
        let state = Arc::clone(&self.state);
        let observer = self.observer.clone();
        let highest = Arc::new(AtomicU8::new(0));
        let started = Arc::new(AtomicBool::new(false));
        Arc::new(move |percent: u8| {
            let percent = percent.min(100);
            let first = !started.swap(true, Ordering::AcqRel);
            let previous = highest.fetch_max(percent, Ordering::AcqRel);
            if !first && percent <= previous {
                return;
            }
            state.send_replace(SubmissionState::Uploading { percent });
            if let Some(observer) = &observer {
                observer(percent);
            }
        })
    }

    fn receipt(&self, file: SelectedFile, target: UploadTarget) -> UploadReceipt {
        UploadReceipt {
            redirect: self.success_redirect.clone(),
            file_name: file.name,
            bytes: file.size,
            duration_seconds: file.duration_seconds,
            object_name: target.object_name,
            video_id: target.video_id,
        }
    }

    fn transition(&self, next: SubmissionState) {
        debug!(state = ?next, "submission state");
        self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::api::ApiResult;
    use crate::upload::uploader::UploadResult;

    const MIB: u64 = 1024 * 1024;

    struct FixedProber {
        seconds: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DurationProber for FixedProber {
        async fn probe(&self, _path: &Path) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seconds
        }
    }

    #[derive(Default)]
    struct RecordingRequester {
        requests: Mutex<Vec<UploadUrlRequest>>,
        reject_with: Option<u16>,
    }

    #[async_trait]
    impl UploadUrlRequester for RecordingRequester {
        async fn request_upload_url(&self, request: &UploadUrlRequest) -> ApiResult<UploadTarget> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            if let Some(status) = self.reject_with {
                return Err(ApiError::ServerRejected {
                    status,
                    reason: Some("upload_url_error".into()),
                });
            }
            Ok(UploadTarget {
                upload_url: "https://storage.example/bucket/uploads/clip.mp4?sig=abc".into(),
                object_name: Some("uploads/clip.mp4".into()),
                video_id: Some(42),
            })
        }
    }

    #[derive(Default)]
    struct ScriptedUploader {
        targets: Mutex<Vec<String>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl DirectUploader for ScriptedUploader {
        async fn upload(
            &self,
            target_url: &str,
            _file: &SelectedFile,
            progress: ProgressCallback,
        ) -> UploadResult<()> {
            self.targets.lock().unwrap().push(target_url.to_string());
            for percent in [0, 25, 25, 10, 60, 100] {
                progress(percent);
                tokio::task::yield_now().await;
            }
            match self.fail_with {
                Some(status) => Err(UploadError::UploadRejected(status)),
                None => Ok(()),
            }
        }
    }

    struct Harness {
        prober: Arc<FixedProber>,
        requester: Arc<RecordingRequester>,
        uploader: Arc<ScriptedUploader>,
        progress: Arc<Mutex<Vec<u8>>>,
        controller: UploadController,
    }

    fn harness(requester: RecordingRequester, uploader: ScriptedUploader) -> Harness {
        let prober = Arc::new(FixedProber {
            seconds: 125.4,
            calls: AtomicUsize::new(0),
        });
        let requester = Arc::new(requester);
        let uploader = Arc::new(uploader);
        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&progress);
        let controller = UploadController::new(
            VideoFileValidator::default(),
            prober.clone(),
            requester.clone(),
            uploader.clone(),
        )
        .with_progress_observer(Arc::new(move |percent: u8| sink.lock().unwrap().push(percent)));
        Harness {
            prober,
            requester,
            uploader,
            progress,
            controller,
        }
    }

    fn form() -> UploadForm {
        UploadForm {
            description: "Semifinal".into(),
            club_id: Some("7".into()),
        }
    }

    #[tokio::test]
    async fn uploads_accepted_file_end_to_end() {
        let h = harness(RecordingRequester::default(), ScriptedUploader::default());
        let file = SelectedFile::new("/videos/semifinal.mp4", "video/mp4", 50 * MIB);

        let outcome = h.controller.submit(Some(file), &form()).await.unwrap();
        let Submission::Completed(receipt) = outcome else {
            panic!("expected completed submission");
        };
        assert_eq!(receipt.redirect, "/upload_prueba?success=true");
        assert_eq!(receipt.video_id, Some(42));
        assert_eq!(receipt.duration_seconds, 125.4);

        let requests = h.requester.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].duration_seconds, 125.4);
        assert_eq!(requests[0].file_name, "semifinal.mp4");
        assert_eq!(requests[0].club_id.as_deref(), Some("7"));

        assert_eq!(
            h.uploader.targets.lock().unwrap().as_slice(),
            ["https://storage.example/bucket/uploads/clip.mp4?sig=abc"]
        );
        assert_eq!(h.progress.lock().unwrap().as_slice(), [0, 25, 60, 100]);
        assert_eq!(
            h.controller.state(),
            SubmissionState::Succeeded {
                redirect: "/upload_prueba?success=true".into()
            }
        );
        assert!(!h.controller.is_submitting());
    }

    #[tokio::test]
    async fn oversized_file_never_reaches_the_network() {
        let h = harness(RecordingRequester::default(), ScriptedUploader::default());
        let file = SelectedFile::new("/videos/long.mp4", "video/mp4", 150 * MIB);

        let err = h.controller.submit(Some(file), &form()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(Rejection::TooLarge { .. })
        ));
        assert!(err.user_message().contains("demasiado grande"));
        assert_eq!(h.prober.calls.load(Ordering::SeqCst), 0);
        assert!(h.requester.requests.lock().unwrap().is_empty());
        assert!(h.uploader.targets.lock().unwrap().is_empty());
        assert!(matches!(h.controller.state(), SubmissionState::Failed { .. }));
        assert!(!h.controller.is_submitting());
    }

    #[tokio::test]
    async fn missing_selection_is_a_validation_failure() {
        let h = harness(RecordingRequester::default(), ScriptedUploader::default());
        let err = h.controller.submit(None, &form()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(Rejection::NoFileSelected)
        ));
        assert!(h.requester.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_submit_is_ignored() {
        let h = harness(RecordingRequester::default(), ScriptedUploader::default());
        let first = SelectedFile::new("/videos/a.mp4", "video/mp4", MIB);
        let second = SelectedFile::new("/videos/b.mp4", "video/mp4", MIB);
        let form = form();

        let (a, b) = tokio::join!(
            h.controller.submit(Some(first), &form),
            h.controller.submit(Some(second), &form)
        );
        assert!(matches!(a.unwrap(), Submission::Completed(_)));
        assert_eq!(b.unwrap(), Submission::Ignored);
        assert_eq!(h.requester.requests.lock().unwrap().len(), 1);
        assert_eq!(h.uploader.targets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn known_duration_skips_probe() {
        let h = harness(RecordingRequester::default(), ScriptedUploader::default());
        let file = SelectedFile::new("/videos/a.mov", "video/quicktime", MIB).with_duration(30.0);

        h.controller.submit(Some(file), &form()).await.unwrap();
        assert_eq!(h.prober.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.requester.requests.lock().unwrap()[0].duration_seconds, 30.0);
    }

    #[tokio::test]
    async fn server_rejection_releases_gate_and_allows_retry() {
        let h = harness(
            RecordingRequester {
                reject_with: Some(500),
                ..Default::default()
            },
            ScriptedUploader::default(),
        );
        let file = SelectedFile::new("/videos/a.mp4", "video/mp4", MIB);

        let err = h
            .controller
            .submit(Some(file.clone()), &form())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "upload_url_error");
        assert!(!h.controller.is_submitting());
        assert!(h.uploader.targets.lock().unwrap().is_empty());

        let err = h.controller.submit(Some(file), &form()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Request(_)));
        assert_eq!(h.requester.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn storage_rejection_surfaces_upload_failure() {
        let h = harness(
            RecordingRequester::default(),
            ScriptedUploader {
                fail_with: Some(403),
                ..Default::default()
            },
        );
        let file = SelectedFile::new("/videos/a.webm", "video/webm", MIB);

        let err = h.controller.submit(Some(file), &form()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Upload(UploadError::UploadRejected(403))
        ));
        assert!(matches!(h.controller.state(), SubmissionState::Failed { .. }));
        assert!(!h.controller.is_submitting());
    }

    #[tokio::test]
    async fn subscribers_observe_failure_until_next_submission() {
        let h = harness(
            RecordingRequester {
                reject_with: Some(500),
                ..Default::default()
            },
            ScriptedUploader::default(),
        );
        let mut states = h.controller.subscribe();
        let recorder = tokio::spawn(async move {
            let mut seen = Vec::new();
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                let failed = matches!(state, SubmissionState::Failed { .. });
                seen.push(state);
                if failed {
                    break;
                }
            }
            seen
        });

        let file = SelectedFile::new("/videos/a.mp4", "video/mp4", MIB);
        h.controller
            .submit(Some(file.clone()), &form())
            .await
            .unwrap_err();
        let seen = recorder.await.unwrap();
        assert_eq!(
            seen.last(),
            Some(&SubmissionState::Failed {
                reason: "upload_url_error".into()
            })
        );

        let mut states = h.controller.subscribe();
        assert!(matches!(*states.borrow(), SubmissionState::Failed { .. }));
        h.controller.submit(Some(file), &form()).await.unwrap_err();
        assert!(states.has_changed().unwrap());
        assert!(matches!(
            *states.borrow_and_update(),
            SubmissionState::Failed { .. }
        ));
        assert_eq!(h.requester.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn next_submission_leaves_failed_state() {
        let h = harness(
            RecordingRequester::default(),
            ScriptedUploader {
                fail_with: Some(403),
                ..Default::default()
            },
        );
        let mut states = h.controller.subscribe();
        let file = SelectedFile::new("/videos/a.mp4", "video/mp4", MIB);
        h.controller.submit(Some(file), &form()).await.unwrap_err();
        assert!(matches!(
            *states.borrow_and_update(),
            SubmissionState::Failed { .. }
        ));

        // a rejected file still moves through validation before failing again
        let oversized = SelectedFile::new("/videos/b.mp4", "video/mp4", 150 * MIB);
        h.controller.submit(Some(oversized), &form()).await.unwrap_err();
        assert!(states.has_changed().unwrap());
        match states.borrow_and_update().clone() {
            SubmissionState::Failed { reason } => assert!(reason.contains("demasiado grande")),
            other => panic!("unexpected state {other:?}"),
        };
    }
}
