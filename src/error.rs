//! Error types for Hark.

use thiserror::Error;

/// Library-level error type for Hark operations.
#[derive(Error, Debug)]
pub enum HarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No transcript available for video {0}: every source was exhausted")]
    NoTranscriptAvailable(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Transcript produced no indexable content")]
    EmptyTranscript,

    #[error("Embedding generation failed: {0}")]
    EmbeddingGenerationFailed(String),

    #[error("Audio download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Coarse category for presenting errors to users.
///
/// Callers get one of these instead of source-by-source detail; the
/// detail stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Downloading or materializing media failed.
    Download,
    /// No usable transcript could be produced.
    Transcription,
    /// An upstream service refused due to quota or rate limits.
    RateLimit,
    /// Anything else.
    Generic,
}

impl HarkError {
    /// Map this error onto a user-facing category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarkError::DownloadFailed(_)
            | HarkError::ToolNotFound(_)
            | HarkError::CapabilityUnavailable(_) => ErrorCategory::Download,
            HarkError::NoTranscriptAvailable(_)
            | HarkError::Transcription(_)
            | HarkError::EmptyTranscript => ErrorCategory::Transcription,
            HarkError::OpenAI(msg) | HarkError::EmbeddingGenerationFailed(msg)
                if msg.contains("429") || msg.to_lowercase().contains("rate limit") =>
            {
                ErrorCategory::RateLimit
            }
            _ => ErrorCategory::Generic,
        }
    }
}

/// Result type alias for Hark operations.
pub type Result<T> = std::result::Result<T, HarkError>;
