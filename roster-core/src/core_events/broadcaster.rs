//! Event bus
//!
//! Uses a tokio broadcast channel so every live entity receives every event in
//! the order it was emitted.

use super::events::ContactEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of buffered events before slow subscribers lag
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Fan-out of server push notifications
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ContactEvent>,
}

impl EventBus {
    /// Create a new event bus
    ///
    /// # Arguments
    /// * `capacity` - Number of events buffered per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers
    ///
    /// # Returns
    /// Number of active subscribers that received the event
    pub fn emit(&self, event: ContactEvent) -> usize {
        trace!(kind = event.kind(), "Emitting contact event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Emit multiple events, preserving their order
    pub fn emit_many(&self, events: Vec<ContactEvent>) {
        for event in events {
            let _ = self.emit(event);
        }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ContactEvent> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
