//! Error types for the PDF watermark server

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for the PDF watermark server
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error categories, used for HTTP status mapping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent an unusable request
    Validation,
    /// Writing uploads to temporary storage failed
    Staging,
    /// The external watermark tool could not run or failed
    Tool,
    /// Anything else that should never reach a caller as their fault
    Internal,
}

/// Error types for the PDF watermark server
#[derive(Error, Debug)]
pub enum Error {
    /// No `file` part in the upload
    #[error("No PDF file was provided")]
    MissingFile,

    /// Uploaded document name does not end in `.pdf`
    #[error("Uploaded file is not a PDF: {filename}")]
    InvalidExtension { filename: String },

    /// Neither `text` nor `image` was provided
    #[error("No watermark text or image was provided")]
    MissingWatermarkContent,

    /// Pattern outside of `grid` / `insert`
    #[error("Invalid pattern: {pattern}")]
    InvalidPattern { pattern: String },

    /// Multipart body could not be read
    #[error("Malformed multipart body: {reason}")]
    Multipart { reason: String },

    /// Upload exceeds the configured body limit
    #[error("Upload too large (max: {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    /// Filesystem failure while staging request artifacts
    #[error("Staging error: {0}")]
    Staging(#[from] std::io::Error),

    /// The watermark executable could not be started
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The watermark executable exited with a non-zero status
    #[error("watermark tool failed (exit code {}): {stderr}", display_code(.code))]
    ExternalTool { code: Option<i32>, stderr: String },

    /// Blocking task was cancelled or panicked
    #[error("Task join error: {reason}")]
    TaskJoin { reason: String },

    /// Invalid server configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingFile
            | Error::InvalidExtension { .. }
            | Error::MissingWatermarkContent
            | Error::InvalidPattern { .. }
            | Error::Multipart { .. }
            | Error::PayloadTooLarge { .. } => ErrorKind::Validation,
            Error::Staging(_) => ErrorKind::Staging,
            Error::ToolLaunch { .. } | Error::ExternalTool { .. } => ErrorKind::Tool,
            Error::TaskJoin { .. } | Error::Config { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status returned to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.kind() == ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Return a sanitized error message safe to send to clients.
    /// Staging paths and launch details are omitted; the tool's stderr is
    /// passed through untouched since it is the caller's only diagnostic.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::MissingFile => "Aucun fichier n'a été fourni".to_string(),
            Error::InvalidExtension { .. } => "Le fichier doit être au format PDF".to_string(),
            Error::MissingWatermarkContent => {
                "Le texte ou l'image du filigrane n'a pas été fourni".to_string()
            }
            Error::InvalidPattern { .. } => "Le motif doit être 'grid' ou 'insert'".to_string(),
            Error::Multipart { reason } => format!("Requête multipart invalide: {}", reason),
            Error::PayloadTooLarge { limit } => {
                format!("Le fichier dépasse la taille maximale de {} octets", limit)
            }
            Error::Staging(_) => "Erreur lors de la préparation des fichiers".to_string(),
            Error::ToolLaunch { .. } => "L'outil de filigrane est indisponible".to_string(),
            Error::ExternalTool { stderr, .. } => {
                format!("Erreur lors de l'application du filigrane: {}", stderr)
            }
            Error::TaskJoin { .. } | Error::Config { .. } => "Erreur interne".to_string(),
        }
    }
}
