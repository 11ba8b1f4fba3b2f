mod review;
mod status;
mod upload;

pub use review::{ReviewArgs, ReviewCommands};
pub use status::{PlaybackArgs, StatusArgs, WatchArgs};
pub use upload::{FileArgs, UploadArgs};
