//! Error types for the producer console

use thiserror::Error;

/// Main error type for showcue-console
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// HTTP transport failure talking to the navigation service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The navigation service rejected a request
    #[error("Server rejected request ({code}): {message}")]
    Server { code: String, message: String },

    /// Audio device / capture failure
    #[error("Audio error: {0}")]
    Audio(String),
}

/// Convenience Result type using ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;
