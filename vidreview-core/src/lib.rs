pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod review;
pub mod status;
pub mod upload;

pub use api::{
    ApiError, ApiResult, BackendClient, PlaybackUrlSource, ReviewActions, StatusSource,
    UploadTarget, UploadUrlRequest, UploadUrlRequester,
};
pub use config::{load_client_config, ClientConfig};
pub use error::{ConfigError, Result};
pub use media::{
    DurationProber, FfprobeProber, Rejection, SelectedFile, Validation, VideoFileValidator,
};
pub use playback::{ModalPlayback, PlaybackRecovery, Player, RecoveryAction};
pub use review::{
    ProcessingState, ReviewDecision, ReviewOutcome, ReviewReceipt, ReviewState, VideoStatus,
};
pub use status::{PollerHandle, StatusBoard, StatusChange, StatusPoller, StatusSnapshot};
pub use upload::{
    DirectUploader, HttpUploader, ProgressCallback, ProgressTracker, SubmitError, Submission,
    SubmissionState, UploadController, UploadError, UploadForm, UploadReceipt,
};
