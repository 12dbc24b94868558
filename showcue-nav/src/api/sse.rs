//! Server-Sent Events stream of navigation events
//!
//! Streams a session's NavEvents to connected observers. Subscribing
//! doubles as a resync: the stream subscribes to the bus first, then sends
//! the persisted current state as its first data frame, so an observer can
//! never be stranded between a missed publish and its first event.

use crate::api::server::AppContext;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use showcue_common::events::NavEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

/// GET /sessions/:id/events
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Path(session_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE observer for session {}", session_id);

    // Subscribe before the snapshot read so no publish between the two is
    // lost (a duplicate frame is harmless, a gap is not)
    let mut rx = ctx.engine.bus().subscribe(session_id).await;
    let engine = ctx.engine.clone();

    let stream = async_stream::stream! {
        yield serialize(&NavEvent::ConnectionStatus { connected: true });

        // Resync snapshot from the store: ground truth at subscribe time
        match engine.current(session_id).await {
            Ok(view) => {
                let snapshot = NavEvent::PositionChanged {
                    session_id: view.session_id,
                    entry_id: view.entry_id,
                    item_ref: view.item_ref,
                    position_display: view.position_display,
                    image_index: view.image_index,
                    image_count: view.image_count,
                    lineup_length: view.lineup_length,
                    updated_at: view.updated_at,
                };
                yield serialize(&snapshot);
            }
            Err(e) => {
                // Session without a lineup still gets a live stream; the
                // observer shows its blocking condition from this frame
                warn!("SSE resync for {} failed: {}", session_id, e);
            }
        }

        loop {
            match rx.recv().await {
                Ok(event) => yield serialize(&event),
                Err(RecvError::Lagged(skipped)) => {
                    // Dropped events are hints only; resync from the store
                    warn!("SSE observer lagged, {} events skipped", skipped);
                    if let Ok(view) = engine.current(session_id).await {
                        let snapshot = NavEvent::PositionChanged {
                            session_id: view.session_id,
                            entry_id: view.entry_id,
                            item_ref: view.item_ref,
                            position_display: view.position_display,
                            image_index: view.image_index,
                            image_count: view.image_count,
                            lineup_length: view.lineup_length,
                            updated_at: view.updated_at,
                        };
                        yield serialize(&snapshot);
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn serialize(event: &NavEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        warn!("Failed to serialize event: {}", e);
        "{}".to_string()
    });
    Ok(Event::default().event(event.event_type()).data(data))
}
