use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use vidreview_core::{
    load_client_config, ApiError, BackendClient, ClientConfig, ConfigError, DurationProber,
    FfprobeProber, HttpUploader, ProgressCallback, ReviewDecision, ReviewOutcome, SelectedFile,
    StatusBoard, StatusChange, StatusPoller, SubmitError, Submission, UploadController,
    UploadError, UploadForm, UploadReceipt, Validation, VideoFileValidator, VideoStatus,
};

mod commands;

pub use commands::{
    FileArgs, PlaybackArgs, ReviewArgs, ReviewCommands, StatusArgs, UploadArgs, WatchArgs,
};

pub const DEFAULT_CONFIG_PATH: &str = "configs/client.toml";

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Submit(#[from] SubmitError),
    #[error("upload client error: {0}")]
    Upload(#[from] UploadError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("el servidor no devolvió una URL de reproducción para el video {0}")]
    MissingPlayback(i64),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Video upload and review client", long_about = None)]
pub struct Cli {
    /// Path to client.toml; built-in defaults apply when the default path is absent
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides server.base_url
    #[arg(long)]
    pub base_url: Option<String>,
    /// Overrides server.user_id (sent as X-User-Id)
    #[arg(long)]
    pub user_id: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Uploads a video through a signed storage url
    Upload(UploadArgs),
    /// Checks size and type of a local file
    Validate(FileArgs),
    /// Reads the duration of a local file with ffprobe
    Probe(FileArgs),
    /// Accepts or rejects a video
    #[command(subcommand)]
    Review(ReviewCommands),
    /// Shows review and processing state of videos
    Status(StatusArgs),
    /// Polls video states and prints changes
    Watch(WatchArgs),
    /// Requests a fresh signed playback url
    PlaybackUrl(PlaybackArgs),
    /// Prints shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(*shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let context = AppContext::new(&cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(context.dispatch(&cli.command, cli.format))
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

/// Resolves the configuration once CLI overrides are applied.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => load_client_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_client_config(DEFAULT_CONFIG_PATH)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(user_id) = &cli.user_id {
        config.server.user_id = Some(user_id.clone());
    }
    config.validate()?;
    Ok(config)
}

#[derive(Debug)]
struct AppContext {
    config: ClientConfig,
    backend: BackendClient,
    validator: VideoFileValidator,
    prober: FfprobeProber,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = resolve_config(cli)?;
        let backend = BackendClient::from_config(&config)?;
        let validator = VideoFileValidator::from_config(&config.upload);
        let prober = FfprobeProber::from_config(&config.probe);
        debug!(base_url = %backend.base_url(), "client configured");
        Ok(Self {
            config,
            backend,
            validator,
            prober,
        })
    }

    async fn dispatch(&self, command: &Commands, format: OutputFormat) -> Result<()> {
        match command {
            Commands::Upload(args) => {
                let report = self.upload(args, format).await?;
                render(&report, format)
            }
            Commands::Validate(args) => {
                let report = self.validate(args).await?;
                render(&report, format)?;
                match report.reason {
                    Some(reason) => Err(AppError::Rejected(reason)),
                    None => Ok(()),
                }
            }
            Commands::Probe(args) => {
                let report = self.probe(args).await?;
                render(&report, format)
            }
            Commands::Review(review) => {
                let report = self.review(review).await?;
                render(&report, format)
            }
            Commands::Status(args) => {
                let videos = self.backend.fetch_statuses(&args.ids).await?;
                render(&StatusList { videos }, format)
            }
            Commands::Watch(args) => self.watch(args, format).await,
            Commands::PlaybackUrl(args) => {
                let url = self
                    .backend
                    .signed_playback_url(args.id)
                    .await?
                    .ok_or(AppError::MissingPlayback(args.id))?;
                render(
                    &PlaybackReport {
                        video_id: args.id,
                        url,
                    },
                    format,
                )
            }
            Commands::Completions { .. } => Ok(()),
        }
    }

    async fn open_file(&self, path: &Path, mime: Option<&str>) -> Result<SelectedFile> {
        let file = SelectedFile::open(path).await?;
        Ok(match mime {
            Some(mime) => file.with_mime(mime),
            None => file,
        })
    }

    async fn upload(&self, args: &UploadArgs, format: OutputFormat) -> Result<UploadReport> {
        let mut file = self.open_file(&args.file, args.mime.as_deref()).await?;
        if let Some(seconds) = args.duration {
            file = file.with_duration(seconds);
        }

        let uploader = HttpUploader::new(self.config.server.request_timeout())?;
        let mut controller = UploadController::new(
            self.validator.clone(),
            Arc::new(self.prober.clone()),
            Arc::new(self.backend.clone()),
            Arc::new(uploader),
        )
        .with_success_redirect(self.config.upload.success_redirect.clone());
        if format == OutputFormat::Text {
            controller = controller.with_progress_observer(progress_line());
        }

        let mut states = controller.subscribe();
        let watcher = tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                debug!(?state, "submission state");
            }
        });

        let form = UploadForm {
            description: args.description.clone(),
            club_id: args.club_id.clone(),
        };
        let outcome = controller.submit(Some(file), &form).await;
        drop(controller);
        let _ = watcher.await;
        if format == OutputFormat::Text {
            eprintln!();
        }

        match outcome? {
            Submission::Completed(receipt) => Ok(UploadReport::from(receipt)),
            Submission::Ignored => Err(AppError::Rejected(
                "ya hay una subida en curso".to_string(),
            )),
        }
    }

    async fn validate(&self, args: &FileArgs) -> Result<ValidationReport> {
        let file = self.open_file(&args.file, args.mime.as_deref()).await?;
        let reason = match self.validator.validate_file(&file) {
            Validation::Accepted => None,
            Validation::Rejected(rejection) => Some(rejection.to_string()),
        };
        Ok(ValidationReport {
            file: file.name,
            mime: file.mime,
            bytes: file.size,
            accepted: reason.is_none(),
            reason,
        })
    }

    async fn probe(&self, args: &FileArgs) -> Result<ProbeReport> {
        let file = self.open_file(&args.file, args.mime.as_deref()).await?;
        let duration_seconds = self.prober.probe(&file.path).await;
        Ok(ProbeReport {
            file: file.name,
            duration_seconds,
        })
    }

    async fn review(&self, command: &ReviewCommands) -> Result<ReviewOutcome> {
        let (args, decision) = match command {
            ReviewCommands::Accept(args) => (args, ReviewDecision::Accept),
            ReviewCommands::Reject(args) => (args, ReviewDecision::Reject),
        };
        Ok(self.backend.review(args.id, decision).await?)
    }

    async fn watch(&self, args: &WatchArgs, format: OutputFormat) -> Result<()> {
        let interval = args
            .interval
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.config.polling.interval());
        let poller = StatusPoller::new(Arc::new(self.backend.clone()), interval);
        let (handle, mut snapshots) = poller.spawn(args.ids.clone());
        info!(ids = ?args.ids, interval_secs = interval.as_secs(), "watching video status");

        let mut board = StatusBoard::default();
        let mut polls = 0usize;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping status watch");
                    break;
                }
                snapshot = snapshots.recv() => {
                    let Some(snapshot) = snapshot else { break };
                    polls += 1;
                    let changes = board.apply(&snapshot);
                    if !changes.is_empty() {
                        render(
                            &ChangeBatch {
                                fetched_at: snapshot.fetched_at,
                                changes,
                            },
                            format,
                        )?;
                    }
                    let settled = !snapshot.videos.is_empty()
                        && snapshot.videos.iter().all(|video| video.processing.is_terminal());
                    if args.until_settled && settled {
                        break;
                    }
                    if args.max_polls.is_some_and(|max| polls >= max) {
                        break;
                    }
                }
            }
        }
        handle.stop().await;
        Ok(())
    }
}

/// Rewrites a single stderr line as the upload advances.
fn progress_line() -> ProgressCallback {
    Arc::new(|percent: u8| {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\rSubiendo... {percent}%");
        let _ = stderr.flush();
    })
}

#[derive(Debug, Serialize)]
struct UploadReport {
    file: String,
    bytes: u64,
    duration_seconds: f64,
    redirect: String,
    object_name: Option<String>,
    video_id: Option<i64>,
}

impl From<UploadReceipt> for UploadReport {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            file: receipt.file_name,
            bytes: receipt.bytes,
            duration_seconds: receipt.duration_seconds,
            redirect: receipt.redirect,
            object_name: receipt.object_name,
            video_id: receipt.video_id,
        }
    }
}

impl DisplayFallback for UploadReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "Video subido: {} ({:.1} MiB, {:.1}s)",
            self.file,
            self.bytes as f64 / (1024.0 * 1024.0),
            self.duration_seconds
        )];
        if let Some(id) = self.video_id {
            lines.push(format!("ID del video: {id}"));
        }
        if let Some(object) = &self.object_name {
            lines.push(format!("Objeto: {object}"));
        }
        lines.push(format!("Siguiente: {}", self.redirect));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    file: String,
    mime: String,
    bytes: u64,
    accepted: bool,
    reason: Option<String>,
}

impl DisplayFallback for ValidationReport {
    fn display(&self) -> String {
        let mime = if self.mime.is_empty() {
            "<tipo desconocido>"
        } else {
            self.mime.as_str()
        };
        match &self.reason {
            None => format!("{} | {} | {} bytes | aceptado", self.file, mime, self.bytes),
            Some(reason) => format!("{} | {} | {} bytes | {}", self.file, mime, self.bytes, reason),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    file: String,
    duration_seconds: f64,
}

impl DisplayFallback for ProbeReport {
    fn display(&self) -> String {
        if self.duration_seconds > 0.0 {
            format!("{}: {:.2}s", self.file, self.duration_seconds)
        } else {
            format!("{}: duración desconocida", self.file)
        }
    }
}

impl DisplayFallback for ReviewOutcome {
    fn display(&self) -> String {
        match self {
            ReviewOutcome::Applied(receipt) => {
                format!("#{} [{}] {}", receipt.video_id, receipt.badge, receipt.message)
            }
            ReviewOutcome::Redirected { location } => match location {
                Some(location) => format!("Revisión registrada; el servidor redirigió a {location}"),
                None => "Revisión registrada; recarga para ver el nuevo estado".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusList {
    videos: Vec<VideoStatus>,
}

impl DisplayFallback for StatusList {
    fn display(&self) -> String {
        if self.videos.is_empty() {
            return "No se encontraron videos".to_string();
        }
        let mut lines = Vec::new();
        for video in &self.videos {
            let score = video
                .safety_score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "#{} | {} | processing={} | score={}",
                video.id,
                video.review.label(),
                video.processing.as_str(),
                score
            ));
            if let Some(text) = &video.moderation_text {
                lines.push(format!("    {text}"));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ChangeBatch {
    fetched_at: DateTime<Utc>,
    changes: Vec<StatusChange>,
}

impl DisplayFallback for ChangeBatch {
    fn display(&self) -> String {
        let stamp = self.fetched_at.format("%H:%M:%S");
        self.changes
            .iter()
            .map(|change| match (change.previous_review, change.previous_processing) {
                (Some(review), Some(processing)) => format!(
                    "[{stamp}] #{} {}/{} -> {}/{}",
                    change.id,
                    review.as_str(),
                    processing.as_str(),
                    change.review.as_str(),
                    change.processing.as_str()
                ),
                _ => format!(
                    "[{stamp}] #{} {}/{}",
                    change.id,
                    change.review.as_str(),
                    change.processing.as_str()
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
struct PlaybackReport {
    video_id: i64,
    url: String,
}

impl DisplayFallback for PlaybackReport {
    fn display(&self) -> String {
        self.url.clone()
    }
}
