use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Content type sent when the file carries no declared type.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// A local video chosen for upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub size: u64,
    /// Seconds; zero while unknown.
    pub duration_seconds: f64,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        Self {
            path,
            name,
            mime: mime.into(),
            size,
            duration_seconds: 0.0,
        }
    }

    /// Reads size from disk and infers the MIME type from the extension.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let mime = mime_from_extension(path).unwrap_or_default();
        Ok(Self::new(path, mime, metadata.len()))
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn content_type(&self) -> &str {
        if self.mime.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.mime
        }
    }

    pub fn has_duration(&self) -> bool {
        self.duration_seconds > 0.0
    }

    pub fn size_mib(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" | "qt" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "3g2" => "video/3gpp2",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        _ => return None,
    };
    Some(mime)
}
