//! HTTP API integration tests
//!
//! Spins up the real router on an OS-assigned port and exercises it with
//! reqwest, the way the host display and mobile controller clients do.

use showcue_common::api::NavigationStateResponse;
use showcue_common::db;
use showcue_nav::api::{create_router, AppContext};
use showcue_nav::bus::NavBus;
use showcue_nav::catalog::SqliteCatalog;
use showcue_nav::engine::NavigationEngine;
use showcue_nav::store::SqliteStore;
use std::sync::Arc;
use uuid::Uuid;

/// Start the service on 127.0.0.1:0 with a 3-entry lineup; returns the
/// base URL and the seeded session id
async fn start_server() -> (String, Uuid) {
    let pool = db::open_in_memory().await.unwrap();
    let session = db::insert_session(&pool, "api test").await.unwrap();
    for (n, images) in [(1u32, 2u32), (2, 1), (3, 4)] {
        db::insert_lineup_entry(&pool, session, n, &format!("sku-{}", n), images)
            .await
            .unwrap();
    }

    let engine = Arc::new(NavigationEngine::new(
        Arc::new(SqliteCatalog::new(pool.clone())),
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(NavBus::new()),
    ));
    let app = create_router(AppContext { engine });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), session)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (base, _) = start_server().await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "showcue-nav");
}

#[tokio::test]
async fn navigate_jump_and_resync_read() {
    let (base, session) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions/{}/navigate", base, session))
        .json(&serde_json::json!({"command": "JumpToPosition", "position": 3}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let state: NavigationStateResponse = resp.json().await.unwrap();
    assert_eq!(state.position_display, 3);
    assert_eq!(state.image_index, 0);

    // Resync read sees the same persisted position
    let resp = reqwest::get(format!("{}/sessions/{}/navigation", base, session))
        .await
        .unwrap();
    let state: NavigationStateResponse = resp.json().await.unwrap();
    assert_eq!(state.position_display, 3);
}

#[tokio::test]
async fn out_of_range_jump_is_unprocessable() {
    let (base, session) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions/{}/navigate", base, session))
        .json(&serde_json::json!({"command": "JumpToPosition", "position": 99}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_position");

    // No mutation happened
    let resp = reqwest::get(format!("{}/sessions/{}/navigation", base, session))
        .await
        .unwrap();
    let state: NavigationStateResponse = resp.json().await.unwrap();
    assert_eq!(state.position_display, 1);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (base, _) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions/{}/navigate", base, Uuid::new_v4()))
        .json(&serde_json::json!({"command": "Next"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn sequential_commands_over_http() {
    let (base, session) = start_server().await;
    let client = reqwest::Client::new();

    for (command, expect_position) in [("Next", 2u32), ("Next", 3), ("Next", 1), ("Previous", 3)] {
        let resp = client
            .post(format!("{}/sessions/{}/navigate", base, session))
            .json(&serde_json::json!({"command": command}))
            .send()
            .await
            .unwrap();
        let state: NavigationStateResponse = resp.json().await.unwrap();
        assert_eq!(state.position_display, expect_position, "after {}", command);
    }
}

#[tokio::test]
async fn sse_stream_opens_with_resync_snapshot() {
    let (base, session) = start_server().await;

    let resp = reqwest::get(format!("{}/sessions/{}/events", base, session))
        .await
        .unwrap();
    assert!(resp.status().is_success());

    // The first frames carry the connection status and the persisted
    // current state
    let mut collected = String::new();
    let mut resp = resp;
    while collected.len() < 64 || !collected.contains("PositionChanged") {
        match tokio::time::timeout(std::time::Duration::from_secs(5), resp.chunk()).await {
            Ok(Ok(Some(chunk))) => collected.push_str(&String::from_utf8_lossy(&chunk)),
            _ => break,
        }
    }
    assert!(collected.contains("ConnectionStatus"));
    assert!(collected.contains("PositionChanged"));
    assert!(collected.contains("\"position_display\":1"));
}
