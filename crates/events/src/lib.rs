//! Vigia broadcast sink and notification delivery.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Real-time listeners subscribe to it.
//! - [`BroadcastMessage`] is the `{type, ts, payload}` envelope every
//!   listener receives.
//! - [`OutboxDelivery`] is the background loop that drains the
//!   notification outbox.

pub mod bus;
pub mod delivery;

pub use bus::{BroadcastMessage, EventBus};
pub use delivery::{DeliveryConfig, DeliveryError, DeliveryReport, OutboxDelivery};
