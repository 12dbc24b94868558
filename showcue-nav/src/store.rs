//! Position store — durable record of the current navigation position
//!
//! Single source of truth for "what is on screen right now". One row per
//! session with upsert semantics, mutated exclusively by the navigation
//! engine. Broadcast events are a low-latency hint layered on top; anything
//! that reconnects reads this store.
//!
//! The trait seam exists so tests can wrap the store (e.g. with an
//! artificial delay) and prove the write-before-publish ordering.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Authoritative current-position record for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub session_id: Uuid,
    /// Current lineup entry; must belong to the same session's lineup
    pub current_entry_id: Uuid,
    /// Zero-based, `0 <= index < image_count(current_entry)`
    pub current_image_index: u32,
    /// Timestamp of the last mutation, used for staleness checks
    pub updated_at: DateTime<Utc>,
}

/// Durable persistence of [`NavigationState`]
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Load the persisted state, or None before first initialization
    async fn load(&self, session_id: Uuid) -> Result<Option<NavigationState>>;

    /// Durably write the state (upsert)
    async fn save(&self, state: &NavigationState) -> Result<()>;
}

/// Position store backed by the shared SQLite database
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for SqliteStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<NavigationState>> {
        let row: Option<(Option<String>, i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT current_entry_id, current_image_index, updated_at
            FROM navigation_state
            WHERE session_id = ?
            "#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            // A row with a NULL entry predates first initialization and is
            // treated as absent
            Some((Some(entry_id), image_index, updated_at)) => Ok(Some(NavigationState {
                session_id,
                current_entry_id: Uuid::parse_str(&entry_id).map_err(|e| {
                    crate::NavError::Internal(format!("Invalid UUID in navigation_state: {}", e))
                })?,
                current_image_index: image_index as u32,
                updated_at,
            })),
            _ => Ok(None),
        }
    }

    async fn save(&self, state: &NavigationState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO navigation_state (session_id, current_entry_id, current_image_index, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                current_entry_id = excluded.current_entry_id,
                current_image_index = excluded.current_image_index,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(state.session_id.to_string())
        .bind(state.current_entry_id.to_string())
        .bind(state.current_image_index as i64)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
