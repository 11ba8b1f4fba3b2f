use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ProbeSection;

/// Best-effort media duration lookup. Implementations never fail: anything
/// that prevents reading the duration yields `0.0`.
#[async_trait]
pub trait DurationProber: Send + Sync {
    async fn probe(&self, path: &Path) -> f64;
}

/// Reads container metadata with `ffprobe -show_format`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(10))
    }
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ProbeSection) -> Self {
        Self::new(&config.ffprobe_path, config.timeout())
    }
}

#[async_trait]
impl DurationProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> f64 {
        let mut command = Command::new(&self.program);
        command
            .kill_on_drop(true)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg(path);
        match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let duration = parse_ffprobe_duration(&output.stdout);
                debug!(path = %path.display(), duration, "probed media duration");
                duration
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(path = %path.display(), "ffprobe returned non-zero status: {stderr}");
                0.0
            }
            Ok(Err(err)) => {
                warn!(program = %self.program.display(), error = %err, "failed to run ffprobe");
                0.0
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "ffprobe timed out"
                );
                0.0
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

pub fn parse_ffprobe_duration(stdout: &[u8]) -> f64 {
    let parsed: FfprobeOutput = match serde_json::from_slice(stdout) {
        Ok(parsed) => parsed,
        Err(_) => return 0.0,
    };
    let seconds = parsed
        .format
        .and_then(|format| format.duration)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or_default();
    sanitize_duration(seconds)
}

/// Non-finite and negative durations are treated as unknown.
pub fn sanitize_duration(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
