//! Error types for showcue-nav
//!
//! Defines service-specific error types using thiserror for clear error
//! propagation. Engine failures are returned to the command's caller only;
//! they are never fanned out over the broadcast bus.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the navigation service
#[derive(Error, Debug)]
pub enum NavError {
    /// Jump target outside 1..=lineup_length, or the target entry vanished
    /// between catalog read and application (fail closed, no mutation)
    #[error("Invalid position {requested} (lineup has {lineup_length} entries)")]
    InvalidPosition { requested: u32, lineup_length: u32 },

    /// Session has no lineup entries; nothing to navigate
    #[error("Session {0} has an empty lineup")]
    NoLineup(Uuid),

    /// Session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Persistence failure; the command failed entirely and no publish
    /// occurred
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using NavError
pub type Result<T> = std::result::Result<T, NavError>;
