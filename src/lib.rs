use thiserror::Error;

pub type Result<T> = std::result::Result<T, PdfChatError>;

#[derive(Error, Debug)]
pub enum PdfChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Service error: {0}")]
    TransientService(String),

    #[error("Input too large: {0}")]
    InputTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl PdfChatError {
    /// True for failures worth retrying later (network, rate limits, 5xx).
    /// The pipeline itself never retries; callers can use this to phrase
    /// error messages.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, PdfChatError::TransientService(_))
    }
}

pub mod chat;
pub mod chunking;
pub mod commands;
pub mod config;
pub mod database;
pub mod gemini;
pub mod ingest;
pub mod pdf;
