//! Notification fan-out.
//!
//! A [`DispatchBridge`] owns an ordered list of [`EventSink`]s and hands
//! every [`Notification`] to each of them in turn. The connector only ever
//! calls [`DispatchBridge::publish`]; sinks can be added or removed without
//! touching it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

// ============================================================================
// Notification
// ============================================================================

/// One event on its way to local consumers.
///
/// The payload is shared: every sink sees the same allocation.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Local (normalized) event name.
    pub name: String,

    /// Payload exactly as the transport delivered it.
    pub payload: Arc<Value>,
}

impl Notification {
    /// Creates a notification.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload: Arc::new(payload),
        }
    }
}

// ============================================================================
// EventSink
// ============================================================================

/// Destination for notifications.
///
/// Implementations must not panic and must not block.
pub trait EventSink: Send + Sync {
    /// Delivers one notification.
    fn publish(&self, notification: &Notification);
}

// ============================================================================
// DispatchBridge
// ============================================================================

/// Delivers notifications to every sink, in the order sinks were added.
#[derive(Clone, Default)]
pub struct DispatchBridge {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl fmt::Debug for DispatchBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchBridge")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl DispatchBridge {
    /// Creates a bridge with no sinks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sink.
    #[inline]
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks.
    #[inline]
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Publishes `payload` under `name` to every sink.
    ///
    /// Returns the notification that was delivered.
    pub fn publish(&self, name: impl Into<String>, payload: Value) -> Notification {
        let notification = Notification::new(name, payload);

        trace!(event = %notification.name, sinks = self.sinks.len(), "Dispatching");

        for sink in &self.sinks {
            sink.publish(&notification);
        }

        notification
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    /// Records (sink tag, event name, payload address).
    struct RecordingSink {
        tag: &'static str,
        log: Arc<Mutex<Vec<(&'static str, String, usize)>>>,
    }

    impl EventSink for RecordingSink {
        fn publish(&self, notification: &Notification) {
            self.log.lock().push((
                self.tag,
                notification.name.clone(),
                Arc::as_ptr(&notification.payload) as usize,
            ));
        }
    }

    #[test]
    fn test_publish_reaches_sinks_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bridge = DispatchBridge::new()
            .with_sink(Arc::new(RecordingSink {
                tag: "first",
                log: Arc::clone(&log),
            }))
            .with_sink(Arc::new(RecordingSink {
                tag: "second",
                log: Arc::clone(&log),
            }));

        let notification = bridge.publish("score-update", json!({ "scores": {} }));

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
        assert_eq!(log[0].1, "score-update");
        let address = Arc::as_ptr(&notification.payload) as usize;
        assert_eq!(log[0].2, address);
        assert_eq!(log[1].2, address);
    }

    #[test]
    fn test_publish_without_sinks() {
        let bridge = DispatchBridge::new();
        assert_eq!(bridge.sink_count(), 0);

        let notification = bridge.publish("reaction", Value::Null);
        assert_eq!(notification.name, "reaction");
    }
}
