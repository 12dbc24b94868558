//! Read-only catalog collaborator
//!
//! The navigation engine consumes the lineup through this seam and never
//! writes to it. Catalog edits mid-broadcast are rare; reads are assumed
//! consistent for the duration of one navigation command.

use crate::error::{NavError, Result};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// One catalog item's placement within a session lineup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    /// 1-based display position
    pub position: u32,
    /// Catalog item reference
    pub item_ref: String,
    pub image_count: u32,
}

/// Read-only lineup queries consumed by the navigation engine
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Whether the session exists at all
    async fn session_exists(&self, session_id: Uuid) -> Result<bool>;

    /// Number of lineup entries in the session
    async fn lineup_length(&self, session_id: Uuid) -> Result<u32>;

    /// Entry at a 1-based position, or None if no entry holds it
    async fn entry_at_position(&self, session_id: Uuid, position: u32)
        -> Result<Option<LineupEntry>>;

    /// Entry by id, or None if it was removed
    async fn entry_by_id(&self, entry_id: Uuid) -> Result<Option<LineupEntry>>;
}

/// Catalog backed by the shared SQLite lineup tables
pub struct SqliteCatalog {
    pool: Pool<Sqlite>,
}

impl SqliteCatalog {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn session_exists(&self, session_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?)")
            .bind(session_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn lineup_length(&self, session_id: Uuid) -> Result<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lineup_entries WHERE session_id = ?")
                .bind(session_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u32)
    }

    async fn entry_at_position(
        &self,
        session_id: Uuid,
        position: u32,
    ) -> Result<Option<LineupEntry>> {
        let row: Option<(String, i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT id, position, item_ref, image_count
            FROM lineup_entries
            WHERE session_id = ? AND position = ?
            "#,
        )
        .bind(session_id.to_string())
        .bind(position as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, position, item_ref, image_count)| {
            Ok(LineupEntry {
                id: parse_uuid(&id)?,
                session_id,
                position: position as u32,
                item_ref,
                image_count: image_count as u32,
            })
        })
        .transpose()
    }

    async fn entry_by_id(&self, entry_id: Uuid) -> Result<Option<LineupEntry>> {
        let row: Option<(String, String, i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT id, session_id, position, item_ref, image_count
            FROM lineup_entries
            WHERE id = ?
            "#,
        )
        .bind(entry_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, session_id, position, item_ref, image_count)| {
            Ok(LineupEntry {
                id: parse_uuid(&id)?,
                session_id: parse_uuid(&session_id)?,
                position: position as u32,
                item_ref,
                image_count: image_count as u32,
            })
        })
        .transpose()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| NavError::Internal(format!("Invalid UUID in database: {}", e)))
}
