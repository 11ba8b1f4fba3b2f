mod file;
mod probe;
mod validator;

pub use file::{mime_from_extension, SelectedFile, DEFAULT_CONTENT_TYPE};
pub use probe::{parse_ffprobe_duration, sanitize_duration, DurationProber, FfprobeProber};
pub use validator::{Rejection, Validation, VideoFileValidator};
