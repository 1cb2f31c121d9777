//! Ambient broadcast channel.
//!
//! The [`EventBus`] is created once at application start and cloned into
//! whichever modules care. Any holder can [`subscribe`](EventBus::subscribe)
//! and observe every dispatched event as a [`LocalEvent`] without a
//! reference to the connector.
//!
//! Events carry a namespaced name (`party:state-change`) and the shared
//! payload as `detail`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use crate::protocol::{BROADCAST_PREFIX, ServerEvent};

use super::bridge::{EventSink, Notification};

// ============================================================================
// Constants
// ============================================================================

/// Events buffered per subscriber before the slowest one starts lagging.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

// ============================================================================
// LocalEvent
// ============================================================================

/// An event as seen on the broadcast channel.
#[derive(Debug, Clone)]
pub struct LocalEvent {
    /// Namespaced event name (e.g. `party:score-update`).
    pub name: String,

    /// The payload, shared with every other consumer.
    pub detail: Arc<Value>,
}

impl LocalEvent {
    /// Event name without the namespace prefix.
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .strip_prefix(BROADCAST_PREFIX)
            .unwrap_or(&self.name)
    }

    /// Returns `true` if this is the broadcast of `event`.
    #[inline]
    #[must_use]
    pub fn is(&self, event: ServerEvent) -> bool {
        self.local_name() == event.local_name()
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Process-wide broadcast of dispatched events.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LocalEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with [`DEFAULT_BUS_CAPACITY`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Creates a bus buffering `capacity` events per subscriber (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to every event published from now on.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LocalEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn publish(&self, notification: &Notification) {
        let event = LocalEvent {
            name: format!("{BROADCAST_PREFIX}{}", notification.name),
            detail: Arc::clone(&notification.payload),
        };

        // No subscribers is not an error.
        if self.sender.send(event).is_err() {
            trace!(event = %notification.name, "No bus subscribers");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
