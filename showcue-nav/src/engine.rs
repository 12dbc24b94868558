//! Navigation engine — the single writer of navigation state
//!
//! Applies normalized commands against the position store, validates
//! bounds against the catalog, persists, and then publishes to the
//! broadcast bus. Write-before-publish ordering is mandatory: an event for
//! a state version is never sent before the durable write for that version
//! completes, and a failed write publishes nothing.
//!
//! Commands are serialized per session behind a per-session async mutex;
//! commands for different sessions run concurrently.

use crate::bus::NavBus;
use crate::catalog::{Catalog, LineupEntry};
use crate::error::{NavError, Result};
use crate::store::{NavigationState, PositionStore};
use chrono::Utc;
use showcue_common::api::NavigationStateResponse;
use showcue_common::events::{NavCommand, NavEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct NavigationEngine {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn PositionStore>,
    bus: Arc<NavBus>,
    /// One lock per session; guards load-compute-save-publish as a unit
    session_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl NavigationEngine {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn PositionStore>, bus: Arc<NavBus>) -> Self {
        Self {
            catalog,
            store,
            bus,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn bus(&self) -> &Arc<NavBus> {
        &self.bus
    }

    /// Apply a navigation command for a session
    ///
    /// On success the new state has been durably written and published.
    /// Failures leave the persisted state untouched and are returned to
    /// the caller only — never broadcast.
    pub async fn apply(&self, session_id: Uuid, command: NavCommand) -> Result<NavigationStateResponse> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let lineup_length = self.check_session(session_id).await?;
        let (state, entry) = self.load_or_init(session_id, lineup_length).await?;

        debug!(
            "Applying {:?} to session {} (position {}, image {})",
            command, session_id, entry.position, state.current_image_index
        );

        let (target_entry, target_image) = match command {
            NavCommand::JumpToPosition(n) => {
                let entry = self.resolve_position(session_id, n, lineup_length).await?;
                (entry, 0)
            }
            NavCommand::Next => {
                let target = if entry.position >= lineup_length { 1 } else { entry.position + 1 };
                let entry = self.resolve_position(session_id, target, lineup_length).await?;
                (entry, 0)
            }
            NavCommand::Previous => {
                let target = if entry.position <= 1 { lineup_length } else { entry.position - 1 };
                let entry = self.resolve_position(session_id, target, lineup_length).await?;
                (entry, 0)
            }
            NavCommand::First => {
                let entry = self.resolve_position(session_id, 1, lineup_length).await?;
                (entry, 0)
            }
            NavCommand::Last => {
                let entry = self
                    .resolve_position(session_id, lineup_length, lineup_length)
                    .await?;
                (entry, 0)
            }
            NavCommand::NextImage => {
                if state.current_image_index + 1 >= entry.image_count {
                    // Clamped at the last image: no mutation, no publish
                    return Ok(build_view(&state, &entry, lineup_length));
                }
                let image = state.current_image_index + 1;
                (entry, image)
            }
            NavCommand::PreviousImage => {
                if state.current_image_index == 0 {
                    // Clamped at the first image: no mutation, no publish
                    return Ok(build_view(&state, &entry, lineup_length));
                }
                let image = state.current_image_index - 1;
                (entry, image)
            }
        };

        let new_state = NavigationState {
            session_id,
            current_entry_id: target_entry.id,
            current_image_index: target_image,
            updated_at: Utc::now(),
        };

        // Durable write first; if this fails the command failed entirely
        // and nothing is published
        self.store.save(&new_state).await?;

        let view = build_view(&new_state, &target_entry, lineup_length);
        self.bus
            .publish(session_id, position_changed(&view))
            .await;

        info!(
            "Session {} now at position {} image {}",
            session_id, view.position_display, view.image_index
        );
        Ok(view)
    }

    /// Current state for resync reads, initializing lazily on first access
    ///
    /// Initialization (lineup position 1, image 0) is a durable write but
    /// not a position change; nothing is published.
    pub async fn current(&self, session_id: Uuid) -> Result<NavigationStateResponse> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let lineup_length = self.check_session(session_id).await?;
        let (state, entry) = self.load_or_init(session_id, lineup_length).await?;
        Ok(build_view(&state, &entry, lineup_length))
    }

    async fn session_lock(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Validate the session and return its lineup length
    ///
    /// A session that no longer exists also releases its lock and bus
    /// topic; sessions are deleted out of band and this is where the
    /// engine learns about it.
    async fn check_session(&self, session_id: Uuid) -> Result<u32> {
        if !self.catalog.session_exists(session_id).await? {
            self.evict_session(session_id).await;
            return Err(NavError::SessionNotFound(session_id));
        }
        let lineup_length = self.catalog.lineup_length(session_id).await?;
        if lineup_length == 0 {
            return Err(NavError::NoLineup(session_id));
        }
        Ok(lineup_length)
    }

    /// Release per-session resources for a deleted session; observers of
    /// its topic see their stream close
    async fn evict_session(&self, session_id: Uuid) {
        self.session_locks.lock().await.remove(&session_id);
        self.bus.remove_topic(session_id).await;
    }

    /// Load the persisted state, creating it at position 1 / image 0 on
    /// first access
    async fn load_or_init(
        &self,
        session_id: Uuid,
        lineup_length: u32,
    ) -> Result<(NavigationState, LineupEntry)> {
        if let Some(state) = self.store.load(session_id).await? {
            match self.catalog.entry_by_id(state.current_entry_id).await? {
                Some(entry) => return Ok((state, entry)),
                None => {
                    // The stored entry was removed by a lineup edit.
                    // Recover to position 1 rather than wedging navigation.
                    warn!(
                        "Session {}: stored entry {} no longer in lineup, resetting to position 1",
                        session_id, state.current_entry_id
                    );
                }
            }
        }

        let entry = self
            .resolve_position(session_id, 1, lineup_length)
            .await
            .map_err(|_| NavError::Internal(format!("Session {} lineup has no position 1", session_id)))?;
        let state = NavigationState {
            session_id,
            current_entry_id: entry.id,
            current_image_index: 0,
            updated_at: Utc::now(),
        };
        self.store.save(&state).await?;
        Ok((state, entry))
    }

    /// Resolve a 1-based position to its entry, failing closed when the
    /// position is out of range or the entry vanished under a concurrent
    /// lineup edit
    async fn resolve_position(
        &self,
        session_id: Uuid,
        position: u32,
        lineup_length: u32,
    ) -> Result<LineupEntry> {
        if position < 1 || position > lineup_length {
            return Err(NavError::InvalidPosition {
                requested: position,
                lineup_length,
            });
        }
        self.catalog
            .entry_at_position(session_id, position)
            .await?
            .ok_or(NavError::InvalidPosition {
                requested: position,
                lineup_length,
            })
    }
}

fn build_view(
    state: &NavigationState,
    entry: &LineupEntry,
    lineup_length: u32,
) -> NavigationStateResponse {
    NavigationStateResponse {
        session_id: state.session_id,
        entry_id: entry.id,
        item_ref: entry.item_ref.clone(),
        position_display: entry.position,
        image_index: state.current_image_index,
        image_count: entry.image_count,
        lineup_length,
        updated_at: state.updated_at,
    }
}

/// The broadcast payload for a successful mutation
fn position_changed(view: &NavigationStateResponse) -> NavEvent {
    NavEvent::PositionChanged {
        session_id: view.session_id,
        entry_id: view.entry_id,
        item_ref: view.item_ref.clone(),
        position_display: view.position_display,
        image_index: view.image_index,
        image_count: view.image_count,
        lineup_length: view.lineup_length,
        updated_at: view.updated_at,
    }
}
