//! Observer binding
//!
//! Keeps the console's view of "where the show is" in sync with the
//! navigation service. Broadcast events are hints; the persisted state
//! fetched over HTTP is ground truth, so the binding accepts whichever
//! arrives and the startup sequence always begins with an authoritative
//! fetch.

use chrono::{DateTime, Utc};
use showcue_common::api::NavigationStateResponse;
use showcue_common::NavEvent;
use uuid::Uuid;

/// Deep-link position carried in the console's startup arguments
///
/// Lets a producer rejoin a specific session at a specific position, e.g.
/// from a link shared in the production chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub session_id: Uuid,
    pub position: u32,
}

/// Whether the event stream is currently delivering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Subscribed and receiving events
    Live,
    /// Stream dropped; the view may lag until the next resync
    Stale,
}

/// Snapshot of the current position as the console renders it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionView {
    pub entry_id: Uuid,
    pub item_ref: String,
    pub position_display: u32,
    pub image_index: u32,
    pub image_count: u32,
    pub lineup_length: u32,
    pub updated_at: DateTime<Utc>,
}

/// Event-driven view of one session's position
pub struct ObserverBinding {
    session_id: Uuid,
    view: Option<PositionView>,
    /// Deep-linked position not yet superseded by a live update
    bookmark: Option<u32>,
    status: LinkStatus,
}

impl ObserverBinding {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            view: None,
            bookmark: None,
            status: LinkStatus::Stale,
        }
    }

    /// Adopt a deep-link position for this session
    ///
    /// The bookmark is a local, per-observer starting point: it wins over
    /// the stored snapshot until a live position change supersedes it, and
    /// it is never sent to the session (a stale link must not rewind the
    /// show for everyone else). A bookmark for a different session is
    /// ignored rather than misapplied.
    pub fn seed_bookmark(&mut self, bookmark: &Bookmark) {
        if bookmark.session_id == self.session_id {
            self.bookmark = Some(bookmark.position);
        }
    }

    /// Position to render right now: bookmark over stored position;
    /// `None` before any bookmark or snapshot
    pub fn display_position(&self) -> Option<u32> {
        self.bookmark
            .or_else(|| self.view.as_ref().map(|v| v.position_display))
    }

    pub fn view(&self) -> Option<&PositionView> {
        self.view.as_ref()
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Lineup length as last observed; 0 before the first snapshot
    pub fn lineup_length(&self) -> u32 {
        self.view.as_ref().map(|v| v.lineup_length).unwrap_or(0)
    }

    /// Seed the view from an authoritative HTTP read
    ///
    /// The stored position ranks below an active bookmark, so a snapshot
    /// never clears one; only a live `PositionChanged` does.
    pub fn apply_snapshot(&mut self, state: &NavigationStateResponse) {
        if state.session_id != self.session_id {
            return;
        }
        self.view = Some(PositionView {
            entry_id: state.entry_id,
            item_ref: state.item_ref.clone(),
            position_display: state.position_display,
            image_index: state.image_index,
            image_count: state.image_count,
            lineup_length: state.lineup_length,
            updated_at: state.updated_at,
        });
    }

    /// Fold one broadcast event into the view; returns true if the
    /// rendered state changed
    pub fn apply_event(&mut self, event: &NavEvent) -> bool {
        match event {
            NavEvent::PositionChanged {
                session_id,
                entry_id,
                item_ref,
                position_display,
                image_index,
                image_count,
                lineup_length,
                updated_at,
            } => {
                if *session_id != self.session_id {
                    return false;
                }
                // Events can arrive out of order around a resync; never
                // move the view backwards in time
                if let Some(current) = &self.view {
                    if *updated_at < current.updated_at {
                        return false;
                    }
                }
                // A live change supersedes the deep link
                self.bookmark = None;
                self.view = Some(PositionView {
                    entry_id: *entry_id,
                    item_ref: item_ref.clone(),
                    position_display: *position_display,
                    image_index: *image_index,
                    image_count: *image_count,
                    lineup_length: *lineup_length,
                    updated_at: *updated_at,
                });
                true
            }
            NavEvent::LineupChanged {
                session_id,
                lineup_length,
                ..
            } => {
                if *session_id != self.session_id {
                    return false;
                }
                if let Some(view) = &mut self.view {
                    if view.lineup_length != *lineup_length {
                        view.lineup_length = *lineup_length;
                        return true;
                    }
                }
                false
            }
            NavEvent::ConnectionStatus { connected } => {
                self.status = if *connected {
                    LinkStatus::Live
                } else {
                    LinkStatus::Stale
                };
                false
            }
        }
    }

    /// Mark the stream as dropped (reconnect pending)
    pub fn mark_stale(&mut self) {
        self.status = LinkStatus::Stale;
    }
}
