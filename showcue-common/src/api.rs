//! API request/response types shared by the navigation service and clients

use crate::events::NavCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /sessions/:id/navigate request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Command to apply against the session's navigation state
    #[serde(flatten)]
    pub command: NavCommand,
}

/// Navigation state as exposed to observers
///
/// This is the push-notification / resync shape: the current entry, the
/// image index, and the precomputed 1-based display position. Everything
/// else about the entry (images, pricing, talking points) is re-derived
/// from the catalog given `entry_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationStateResponse {
    /// Owning session
    pub session_id: Uuid,
    /// Current lineup entry
    pub entry_id: Uuid,
    /// Catalog item reference of the current entry
    pub item_ref: String,
    /// 1-based display position
    pub position_display: u32,
    /// Zero-based image index within the current entry
    pub image_index: u32,
    /// Image count of the current entry
    pub image_count: u32,
    /// Lineup length of the session
    pub lineup_length: u32,
    /// Timestamp of the last mutation
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Error payload returned by the navigation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "invalid_position")
    pub error: String,
    /// Human-readable description
    pub message: String,
}

/// GET /health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_request_flattens_command() {
        let req = CommandRequest {
            command: NavCommand::JumpToPosition(5),
        };
        let json = serde_json::to_string(&req).unwrap();
        // Flattened: {"command":"JumpToPosition","position":5}
        assert!(json.contains("\"command\":\"JumpToPosition\""));

        let parsed: CommandRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.command, NavCommand::JumpToPosition(5));
    }
}
