use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Reviewer timestamps are rendered in America/Bogota (UTC-5, no DST).
const REVIEWER_UTC_OFFSET_SECONDS: i32 = -5 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ReviewState {
    #[default]
    Unreviewed,
    Accepted,
    Rejected,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Unreviewed => "sin-revisar",
            ReviewState::Accepted => "aceptado",
            ReviewState::Rejected => "rechazado",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReviewState::Unreviewed => "Sin Revisar",
            ReviewState::Accepted => "Aceptado",
            ReviewState::Rejected => "Rechazado",
        }
    }
}

impl From<Option<String>> for ReviewState {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some("aceptado") => ReviewState::Accepted,
            Some("rechazado") => ReviewState::Rejected,
            _ => ReviewState::Unreviewed,
        }
    }
}

impl From<ReviewState> for String {
    fn from(state: ReviewState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State of the backend analysis pipeline for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ProcessingState {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pendiente",
            ProcessingState::Processing => "procesando",
            ProcessingState::Completed => "completado",
            ProcessingState::Error => "error",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "Pendiente",
            ProcessingState::Processing => "Procesando",
            ProcessingState::Completed => "Completado",
            ProcessingState::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Completed | ProcessingState::Error)
    }
}

impl From<Option<String>> for ProcessingState {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some("procesando") => ProcessingState::Processing,
            Some("completado") => ProcessingState::Completed,
            Some("error") => ProcessingState::Error,
            _ => ProcessingState::Pending,
        }
    }
}

impl From<ProcessingState> for String {
    fn from(state: ProcessingState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of `GET /admin/videos/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStatus {
    pub id: i64,
    #[serde(rename = "estado", default)]
    pub review: ReviewState,
    #[serde(rename = "estado_ia", default)]
    pub processing: ProcessingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_score: Option<f64>,
    #[serde(
        rename = "fecha_procesamiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

impl ReviewDecision {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ReviewDecision::Accept => "aceptar",
            ReviewDecision::Reject => "rechazar",
        }
    }

    pub fn resulting_state(&self) -> ReviewState {
        match self {
            ReviewDecision::Accept => ReviewState::Accepted,
            ReviewDecision::Reject => ReviewState::Rejected,
        }
    }

    pub fn default_failure(&self) -> &'static str {
        match self {
            ReviewDecision::Accept => "No se pudo aceptar el video",
            ReviewDecision::Reject => "No se pudo rechazar el video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReceipt {
    pub video_id: i64,
    pub state: ReviewState,
    pub badge: &'static str,
    pub message: String,
    pub decided_at: DateTime<FixedOffset>,
}

impl ReviewReceipt {
    pub fn new(video_id: i64, decision: ReviewDecision, at: DateTime<Utc>) -> Self {
        let state = decision.resulting_state();
        let offset = FixedOffset::east_opt(REVIEWER_UTC_OFFSET_SECONDS)
            .unwrap_or_else(|| Utc.fix());
        let local = at.with_timezone(&offset);
        let message = format!("{} el {}", state.label(), local.format("%-d/%-m/%Y %-H:%M:%S"));
        Self {
            video_id,
            state,
            badge: state.label(),
            message,
            decided_at: local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The backend answered with a redirect; the caller should reload the view.
    Redirected { location: Option<String> },
    Applied(ReviewReceipt),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_states_map_to_defaults() {
        let status: VideoStatus =
            serde_json::from_str(r#"{"id": 3, "estado": "archivado", "estado_ia": null}"#).unwrap();
        assert_eq!(status.review, ReviewState::Unreviewed);
        assert_eq!(status.processing, ProcessingState::Pending);

        let status: VideoStatus = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(status.review, ReviewState::Unreviewed);
    }

    #[test]
    fn decodes_full_status_row() {
        let status: VideoStatus = serde_json::from_str(
            r#"{"id": 9, "estado": "aceptado", "estado_ia": "completado",
                "moderation_text": "Seguro", "safety_score": 92.5,
                "fecha_procesamiento": "2026-10-18T12:00:00", "puntaje_confianza": 0.9}"#,
        )
        .unwrap();
        assert_eq!(status.review, ReviewState::Accepted);
        assert_eq!(status.processing, ProcessingState::Completed);
        assert!(status.processing.is_terminal());
        assert_eq!(status.safety_score, Some(92.5));
        assert_eq!(status.processed_at.as_deref(), Some("2026-10-18T12:00:00"));
    }

    #[test]
    fn states_serialize_to_wire_values() {
        let json = serde_json::to_value(ReviewState::Rejected).unwrap();
        assert_eq!(json, serde_json::json!("rechazado"));
        let json = serde_json::to_value(ProcessingState::Processing).unwrap();
        assert_eq!(json, serde_json::json!("procesando"));
    }

    #[test]
    fn receipt_uses_reviewer_local_time() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 3, 4, 5).unwrap();
        let receipt = ReviewReceipt::new(7, ReviewDecision::Accept, at);
        assert_eq!(receipt.badge, "Aceptado");
        assert_eq!(receipt.state, ReviewState::Accepted);
        assert_eq!(receipt.message, "Aceptado el 17/10/2026 22:04:05");

        let receipt = ReviewReceipt::new(7, ReviewDecision::Reject, at);
        assert_eq!(receipt.badge, "Rechazado");
        assert!(receipt.message.starts_with("Rechazado el "));
    }

    #[test]
    fn receipt_does_not_pad_day_month_or_hour() {
        // 14:04:05 UTC is 09:04:05 in Bogota
        let at = Utc.with_ymd_and_hms(2026, 10, 8, 14, 4, 5).unwrap();
        let receipt = ReviewReceipt::new(3, ReviewDecision::Accept, at);
        assert_eq!(receipt.message, "Aceptado el 8/10/2026 9:04:05");

        let at = Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 9).unwrap();
        let receipt = ReviewReceipt::new(3, ReviewDecision::Reject, at);
        assert_eq!(receipt.message, "Rechazado el 2/3/2026 0:00:09");
    }
}
