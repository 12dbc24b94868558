//! Database schema and initialization
//!
//! Creates the session/lineup/navigation tables if missing. Schema is
//! created at startup by whichever service opens the database first;
//! statements are idempotent so services can start in any order.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Open (creating if necessary) the SQLite database at `path`
pub async fn open_database(path: &Path) -> Result<Pool<Sqlite>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_db(&pool).await?;
    Ok(pool)
}

/// Open an in-memory database (tests and seeds)
pub async fn open_in_memory() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    init_db(&pool).await?;
    Ok(pool)
}

/// Create tables if they do not exist
pub async fn init_db(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Lineup positions are 1-based, contiguous, unique per session
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lineup_entries (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            item_ref TEXT NOT NULL,
            image_count INTEGER NOT NULL DEFAULT 1,
            UNIQUE(session_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one navigation state per session; current_entry_id is null
    // only before first initialization or after its entry was removed by a
    // lineup edit (the engine then re-initializes to position 1)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS navigation_state (
            session_id TEXT PRIMARY KEY REFERENCES sessions(id) ON DELETE CASCADE,
            current_entry_id TEXT REFERENCES lineup_entries(id) ON DELETE SET NULL,
            current_image_index INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a session row, returning its id
///
/// Lineup management is handled by the catalog service; this helper exists
/// for seeds and tests.
pub async fn insert_session(pool: &Pool<Sqlite>, title: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO sessions (id, title) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(title)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Insert a lineup entry at a 1-based position, returning its id
pub async fn insert_lineup_entry(
    pool: &Pool<Sqlite>,
    session_id: Uuid,
    position: u32,
    item_ref: &str,
    image_count: u32,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO lineup_entries (id, session_id, position, item_ref, image_count)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(session_id.to_string())
    .bind(position as i64)
    .bind(item_ref)
    .bind(image_count as i64)
    .execute(pool)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let pool = open_in_memory().await.unwrap();
        // Second init must not fail
        init_db(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn session_and_lineup_insert() {
        let pool = open_in_memory().await.unwrap();
        let session = insert_session(&pool, "Friday drop").await.unwrap();
        insert_lineup_entry(&pool, session, 1, "sku-1", 3).await.unwrap();
        insert_lineup_entry(&pool, session, 2, "sku-2", 1).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lineup_entries WHERE session_id = ?")
                .bind(session.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn duplicate_position_rejected() {
        let pool = open_in_memory().await.unwrap();
        let session = insert_session(&pool, "s").await.unwrap();
        insert_lineup_entry(&pool, session, 1, "a", 1).await.unwrap();
        let dup = insert_lineup_entry(&pool, session, 1, "b", 1).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn deleting_session_cascades() {
        let pool = open_in_memory().await.unwrap();
        let session = insert_session(&pool, "s").await.unwrap();
        insert_lineup_entry(&pool, session, 1, "a", 1).await.unwrap();

        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lineup_entries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
