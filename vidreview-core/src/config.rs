use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_SUCCESS_REDIRECT: &str = "/upload_prueba?success=true";

pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/avi",
    "video/x-msvideo",
    "video/webm",
    "video/3gpp",
    "video/3gpp2",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ClientConfig {
    pub server: ServerSection,
    pub upload: UploadSection,
    pub probe: ProbeSection,
    pub playback: PlaybackSection,
    pub polling: PollingSection,
}

impl ClientConfig {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server.base_url).map_err(|err| ConfigError::Invalid {
            field: "server.base_url",
            reason: err.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "server.request_timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.probe.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "probe.timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "upload.max_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        if self.upload.allowed_types.is_empty() {
            return Err(ConfigError::Invalid {
                field: "upload.allowed_types",
                reason: "at least one mime type is required".into(),
            });
        }
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.interval_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub base_url: String,
    pub user_id: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            user_id: None,
            request_timeout_seconds: 30,
        }
    }
}

impl ServerSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
    pub success_redirect: String,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
            success_redirect: DEFAULT_SUCCESS_REDIRECT.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub ffprobe_path: String,
    pub timeout_seconds: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".into(),
            timeout_seconds: 10,
        }
    }
}

impl ProbeSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSection {
    pub retry_cooldown_seconds: u64,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            retry_cooldown_seconds: 5,
        }
    }
}

impl PlaybackSection {
    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub interval_seconds: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_seconds: 15,
        }
    }
}

impl PollingSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

pub fn load_client_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    let config: ClientConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })?;
    config.validate()?;
    Ok(config)
}
