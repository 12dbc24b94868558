//! Event and command types for the showcue navigation system
//!
//! Provides the shared command vocabulary (NavCommand) and the broadcast
//! event definitions (NavEvent) used by the navigation service and all
//! connected observers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized navigation command
///
/// Every input surface (keypad jump buffer, arrow/space keys, voice
/// pipeline) resolves to one of these before reaching the navigation
/// engine. Nothing mutates navigation state except through a NavCommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "position")]
pub enum NavCommand {
    /// Jump directly to a 1-based lineup position
    JumpToPosition(u32),
    /// Advance one lineup position (wraps at the end)
    Next,
    /// Step back one lineup position (wraps at the start)
    Previous,
    /// Jump to lineup position 1
    First,
    /// Jump to the last lineup position
    Last,
    /// Advance to the next image of the current entry (clamped)
    NextImage,
    /// Step back to the previous image of the current entry (clamped)
    PreviousImage,
}

/// Navigation events broadcast to all session observers
///
/// Events are fanned out via the per-session broadcast bus and serialized
/// for SSE transmission. All observers of a session receive the same
/// sequence, including the client that originated the change.
///
/// Events are a low-latency hint; the persisted navigation state is ground
/// truth. Observers that reconnect resync from the store, not from replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NavEvent {
    /// Current position changed for a session
    ///
    /// Triggers:
    /// - Host display: re-render current item/image
    /// - Producer console: highlight current lineup row
    /// - Mobile controller: update position readout
    PositionChanged {
        /// Session whose position changed
        session_id: Uuid,
        /// Lineup entry now current
        entry_id: Uuid,
        /// Catalog item reference of the current entry
        item_ref: String,
        /// 1-based display position, precomputed for the UI
        position_display: u32,
        /// Zero-based index of the current image
        image_index: u32,
        /// Image count of the current entry
        image_count: u32,
        /// Lineup length at time of change
        lineup_length: u32,
        /// When the state was persisted
        updated_at: chrono::DateTime<chrono::Utc>,
    },

    /// Lineup composition changed (entries added/removed)
    ///
    /// Triggers:
    /// - Producer console: refresh lineup list
    LineupChanged {
        /// Session whose lineup changed
        session_id: Uuid,
        /// New lineup length
        lineup_length: u32,
        /// When the lineup changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Connection status marker, sent as the stream opens
    ConnectionStatus {
        /// True once the subscription is established
        connected: bool,
    },
}

impl NavEvent {
    /// Event type string used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            NavEvent::PositionChanged { .. } => "PositionChanged",
            NavEvent::LineupChanged { .. } => "LineupChanged",
            NavEvent::ConnectionStatus { .. } => "ConnectionStatus",
        }
    }
}
