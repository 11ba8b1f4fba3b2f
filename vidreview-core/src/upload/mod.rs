mod controller;
mod progress;
mod uploader;

pub use controller::{
    SubmitError, Submission, SubmissionState, UploadController, UploadForm, UploadReceipt,
};
pub use progress::ProgressTracker;
pub use uploader::{DirectUploader, HttpUploader, ProgressCallback, UploadError, UploadResult};
