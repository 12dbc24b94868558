//! Per-session broadcast bus
//!
//! Topic-scoped fan-out of navigation events to all subscribed observers
//! of one session. Publishing is fire-and-forget: there is no delivery
//! guarantee to observers that are disconnected at publish time — they
//! recover via reconnect resync against the position store, not replay.

use showcue_common::events::NavEvent;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Events buffered per session before slow subscribers start lagging.
/// Observers are few (2-5) and resync from the store on lag, so this
/// stays small.
const TOPIC_CAPACITY: usize = 64;

/// Fan-out of [`NavEvent`]s keyed by session id
pub struct NavBus {
    topics: RwLock<HashMap<Uuid, broadcast::Sender<NavEvent>>>,
}

impl NavBus {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a session's event stream, creating the topic lazily
    pub async fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<NavEvent> {
        let mut topics = self.topics.write().await;
        topics
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Broadcast an event to all current subscribers of a session
    ///
    /// Send errors (no receivers) are ignored.
    pub async fn publish(&self, session_id: Uuid, event: NavEvent) {
        let topics = self.topics.read().await;
        if let Some(tx) = topics.get(&session_id) {
            match tx.send(event) {
                Ok(count) => debug!("Published event to {} observers of {}", count, session_id),
                Err(_) => debug!("No observers subscribed to {}", session_id),
            }
        }
    }

    /// Drop a session's topic, e.g. once the session is known deleted
    ///
    /// Subscribed observers see their stream close. Without this the topic
    /// map would grow by one sender per session ever observed.
    pub async fn remove_topic(&self, session_id: Uuid) {
        let mut topics = self.topics.write().await;
        if topics.remove(&session_id).is_some() {
            debug!("Removed event topic for {}", session_id);
        }
    }

    /// Number of observers currently subscribed to a session
    pub async fn observer_count(&self, session_id: Uuid) -> usize {
        let topics = self.topics.read().await;
        topics.get(&session_id).map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for NavBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event() -> NavEvent {
        NavEvent::ConnectionStatus { connected: true }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = NavBus::new();
        let session = Uuid::new_v4();

        let mut rx = bus.subscribe(session).await;
        bus.publish(session, status_event()).await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, NavEvent::ConnectionStatus { connected: true }));
    }

    #[tokio::test]
    async fn topics_are_isolated_per_session() {
        let bus = NavBus::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        let mut rx_a = bus.subscribe(session_a).await;
        let _rx_b = bus.subscribe(session_b).await;

        bus.publish(session_b, status_event()).await;

        // Session A's receiver must see nothing
        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = NavBus::new();
        // Must not panic or error
        bus.publish(Uuid::new_v4(), status_event()).await;
    }

    #[tokio::test]
    async fn removing_a_topic_closes_subscribers() {
        let bus = NavBus::new();
        let session = Uuid::new_v4();

        let mut rx = bus.subscribe(session).await;
        bus.remove_topic(session).await;

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(bus.observer_count(session).await, 0);
    }

    #[tokio::test]
    async fn observer_count_tracks_subscriptions() {
        let bus = NavBus::new();
        let session = Uuid::new_v4();
        assert_eq!(bus.observer_count(session).await, 0);

        let rx1 = bus.subscribe(session).await;
        let rx2 = bus.subscribe(session).await;
        assert_eq!(bus.observer_count(session).await, 2);

        drop(rx1);
        drop(rx2);
    }
}
