//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out [`BroadcastMessage`]s to every connected listener.
//! It is shared via `Arc<EventBus>`. Publishing never blocks and never
//! fails: with no subscribers, or with a full buffer, messages are dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vigia_core::types::Timestamp;

// ---------------------------------------------------------------------------
// BroadcastMessage
// ---------------------------------------------------------------------------

/// The JSON envelope delivered to real-time listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Message type, e.g. `"evento_creado"`. See `vigia_core::messages`.
    #[serde(rename = "type")]
    pub message_type: String,

    pub ts: Timestamp,

    pub payload: serde_json::Value,
}

impl BroadcastMessage {
    pub fn new(message_type: impl Into<String>, ts: Timestamp, payload: serde_json::Value) -> Self {
        Self {
            message_type: message_type.into(),
            ts,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus.
///
/// ```rust
/// use chrono::Utc;
/// use vigia_events::bus::{BroadcastMessage, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(BroadcastMessage::new("evento_creado", Utc::now(), serde_json::json!({})));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread messages are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a message to all current subscribers.
    pub fn publish(&self, message: BroadcastMessage) {
        // A send error only means there are zero receivers.
        if self.sender.send(message).is_err() {
            tracing::trace!("Broadcast dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap();

        bus.publish(BroadcastMessage::new("alerta_creada", ts, json!({"id": 4})));

        let received = rx.recv().await.expect("should receive the message");
        assert_eq!(received.message_type, "alerta_creada");
        assert_eq!(received.ts, ts);
        assert_eq!(received.payload["id"], 4);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_message() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(BroadcastMessage::new("evento_creado", Utc::now(), json!(null)));

        assert_eq!(rx1.recv().await.unwrap().message_type, "evento_creado");
        assert_eq!(rx2.recv().await.unwrap().message_type, "evento_creado");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.publish(BroadcastMessage::new("orphan", Utc::now(), json!({})));
    }

    #[tokio::test]
    async fn full_buffer_drops_oldest_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(BroadcastMessage::new("tick", Utc::now(), json!(i)));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().payload, json!(3));
    }

    #[test]
    fn envelope_serializes_type_field() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap();
        let msg = BroadcastMessage::new("evento_cerrado", ts, json!({"id": 1}));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "evento_cerrado");
        assert_eq!(value["payload"]["id"], 1);
        assert!(value.get("message_type").is_none());
        assert!(value["ts"].as_str().unwrap().starts_with("2024-05-10T08:30:00"));
    }
}
