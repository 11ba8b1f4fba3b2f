use std::fmt;

use serde::Serialize;

use crate::config::{UploadSection, DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_BYTES};

use super::file::SelectedFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    TooLarge { size: u64, max: u64 },
    UnsupportedType { mime: String },
    NoFileSelected,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooLarge { max, .. } => write!(
                f,
                "El archivo es demasiado grande. El tamaño máximo permitido es {}.",
                size_limit(*max)
            ),
            Rejection::UnsupportedType { .. } => write!(
                f,
                "Tipo de archivo no soportado. Formatos permitidos: MP4, MOV, AVI, WebM, 3GP."
            ),
            Rejection::NoFileSelected => {
                write!(f, "Por favor, selecciona un video antes de continuar.")
            }
        }
    }
}

/// Whole megabytes when exact, one decimal above 1 MB, bytes below it.
fn size_limit(max: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if max >= MIB && max % MIB == 0 {
        format!("{}MB", max / MIB)
    } else if max >= MIB {
        format!("{:.1}MB", max as f64 / MIB as f64)
    } else {
        format!("{max} bytes")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Validation {
    Accepted,
    Rejected(Rejection),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Validation::Accepted => None,
            Validation::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Accepts or rejects a candidate upload by declared type and size.
///
/// Selection and drag-and-drop both go through [`VideoFileValidator::validate`].
#[derive(Debug, Clone)]
pub struct VideoFileValidator {
    max_bytes: u64,
    allowed_types: Vec<String>,
}

impl Default for VideoFileValidator {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
        }
    }
}

impl VideoFileValidator {
    pub fn new(max_bytes: u64, allowed_types: Vec<String>) -> Self {
        let allowed_types = allowed_types
            .into_iter()
            .map(|mime| mime.trim().to_ascii_lowercase())
            .collect();
        Self {
            max_bytes,
            allowed_types,
        }
    }

    pub fn from_config(config: &UploadSection) -> Self {
        Self::new(config.max_bytes, config.allowed_types.clone())
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn is_allowed_type(&self, mime: &str) -> bool {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_types.iter().any(|allowed| *allowed == essence)
    }

    pub fn validate(&self, mime: &str, size: u64) -> Validation {
        if size > self.max_bytes {
            return Validation::Rejected(Rejection::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if !self.is_allowed_type(mime) {
            return Validation::Rejected(Rejection::UnsupportedType {
                mime: mime.to_string(),
            });
        }
        Validation::Accepted
    }

    pub fn validate_file(&self, file: &SelectedFile) -> Validation {
        self.validate(&file.mime, file.size)
    }
}
