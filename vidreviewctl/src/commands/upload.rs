use std::path::PathBuf;

use clap::Args;

/// Validates, probes and uploads one video.
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Video file to send
    pub file: PathBuf,
    /// Free-text description stored with the video
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Club the video belongs to; blank means none
    #[arg(long)]
    pub club_id: Option<String>,
    /// Declared content type; inferred from the extension when omitted
    #[arg(long)]
    pub mime: Option<String>,
    /// Skips ffprobe and sends this duration instead
    #[arg(long)]
    pub duration: Option<f64>,
}

/// A local file checked without contacting the backend.
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    pub file: PathBuf,
    /// Declared content type; inferred from the extension when omitted
    #[arg(long)]
    pub mime: Option<String>,
}
