use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error(
        "Credentials file '{}' not found. Download the OAuth client secrets from the Google Cloud Console.",
        .0.display()
    )]
    CredentialsNotFound(PathBuf),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Drive API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Combine error: {0}")]
    Combine(String),
}

impl ScribeError {
    /// Errors that make continuing the batch pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScribeError::CredentialsNotFound(_) | ScribeError::Auth(_))
    }

    /// True when the failure was reported by the remote service itself.
    pub fn is_remote(&self) -> bool {
        matches!(self, ScribeError::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
