//! Error types for Splice.

use thiserror::Error;

/// Main error type for Splice operations.
#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    /// The decoder refused to start playback (e.g. blocked by policy).
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpliceError {
    /// Errors that the end user must see. Everything else is recovered
    /// inside the tick that produced it.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Encoder(_) | Self::ExportInProgress)
    }
}

/// Result type alias for Splice operations.
pub type Result<T> = std::result::Result<T, SpliceError>;
