//! Error types for the gpsd client.

use thiserror::Error;

/// Main error type for session and watch operations.
#[derive(Debug, Error)]
pub enum GpsdError {
    #[error("Failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Session is closed")]
    Closed,

    #[error("gpsd socket is already closed")]
    AlreadyClosed,

    #[error("Watch already started for this session")]
    WatchAlreadyStarted,

    #[error("Watch outcome was already taken")]
    WatchFinished,

    #[error("Watch thread panicked before reporting an outcome")]
    WatchPanicked,
}

/// Per-line decode failures. Never fatal to the watch loop.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not a JSON object with a string `class` field.
    #[error("Malformed report envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The class is known but the message does not fit its schema.
    #[error("Malformed {class} report: {source}")]
    Malformed {
        class: String,
        #[source]
        source: serde_json::Error,
    },

    /// No decoder exists for this class.
    #[error("No decoder for report class: {0}")]
    UnknownClass(String),
}

impl DecodeError {
    /// Class the failing line claimed, if it got that far.
    pub fn class(&self) -> Option<&str> {
        match self {
            DecodeError::Envelope(_) => None,
            DecodeError::Malformed { class, .. } => Some(class),
            DecodeError::UnknownClass(class) => Some(class),
        }
    }
}

/// Result type for gpsd operations.
pub type Result<T> = std::result::Result<T, GpsdError>;
