use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error(
        "server rejected request with status {status}: {}",
        .reason.as_deref().unwrap_or("no reason given")
    )]
    ServerRejected { status: u16, reason: Option<String> },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Message suitable for showing to the person who triggered the request.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Error de conexión. Intenta nuevamente.".to_string(),
            ApiError::ServerRejected {
                reason: Some(reason),
                ..
            } => reason.clone(),
            ApiError::ServerRejected { status, .. } => {
                format!("El servidor rechazó la solicitud (HTTP {status}). Intenta nuevamente.")
            }
            ApiError::Decode(_) | ApiError::Url(_) => {
                "Respuesta inesperada del servidor. Intenta nuevamente.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}
