//! Listener registry.
//!
//! Maps a local event name to the ordered list of callbacks registered for
//! it. Registration order is invocation order. The same callback may be
//! registered more than once; [`ListenerRegistry::off`] removes one
//! registration at a time, matched by identity.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{error, trace};

use super::bridge::{EventSink, Notification};

// ============================================================================
// Types
// ============================================================================

/// A registered callback.
///
/// Identity is the allocation: clones of the same `Listener` are the same
/// listener, two closures with identical code are not.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wraps a closure into a [`Listener`].
///
/// Keep the returned handle to unregister it later.
///
/// # Example
///
/// ```
/// use party_connector::dispatch::{ListenerRegistry, listener};
///
/// let registry = ListenerRegistry::new();
/// let on_score = listener(|payload| println!("scores: {payload}"));
///
/// registry.on("score-update", on_score.clone());
/// assert_eq!(registry.listener_count("score-update"), 1);
///
/// registry.off("score-update", &on_score);
/// assert_eq!(registry.listener_count("score-update"), 0);
/// ```
#[inline]
#[must_use]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Ordered callbacks per local event name.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<FxHashMap<String, Vec<Listener>>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut map = f.debug_map();
        for (event, list) in listeners.iter() {
            map.entry(event, &list.len());
        }
        map.finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the callbacks for `event`.
    pub fn on(&self, event: impl Into<String>, listener: Listener) {
        let event = event.into();
        trace!(event = %event, "Listener registered");
        self.listeners.write().entry(event).or_default().push(listener);
    }

    /// Removes the first registration of `listener` for `event`.
    ///
    /// Returns `true` if a registration was removed. Unknown events and
    /// unregistered listeners are a no-op.
    pub fn off(&self, event: &str, listener: &Listener) -> bool {
        let mut listeners = self.listeners.write();

        let Some(list) = listeners.get_mut(event) else {
            return false;
        };

        let Some(index) = list.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            listeners.remove(event);
        }

        trace!(event = %event, "Listener removed");
        true
    }

    /// Number of registrations for `event`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Calls every listener for `event` with `payload`, in registration order.
    ///
    /// Listeners run on a snapshot taken before the first call, so a
    /// listener may register or remove listeners without deadlocking. A
    /// panicking listener is logged and skipped; the rest still run.
    ///
    /// Returns the number of listeners that panicked.
    pub fn invoke(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.read().get(event) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut failures = 0;
        for listener in snapshot {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                failures += 1;
                error!(
                    event = %event,
                    panic = %panic_message(panic.as_ref()),
                    "Listener panicked"
                );
            }
        }

        failures
    }
}

impl EventSink for ListenerRegistry {
    fn publish(&self, notification: &Notification) {
        self.invoke(&notification.name, &notification.payload);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        listener(move |_| log.lock().push(tag))
    }

    #[test]
    fn test_invocation_follows_registration_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.on("player-joined", recorder(&log, "a"));
        registry.on("player-joined", recorder(&log, "b"));
        registry.on("player-joined", recorder(&log, "c"));

        registry.invoke("player-joined", &json!({ "id": "t1" }));
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_payload_passed_through() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = Arc::clone(&seen);
        registry.on(
            "state-change",
            listener(move |payload| *seen_clone.lock() = Some(payload.clone())),
        );

        let payload = json!({ "current_state": "TRIVIA", "state_data": { "round": 2 } });
        registry.invoke("state-change", &payload);

        assert_eq!(seen.lock().as_ref(), Some(&payload));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let counter = listener(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.on("reaction", counter.clone());
        registry.on("reaction", counter.clone());
        assert_eq!(registry.listener_count("reaction"), 2);

        registry.invoke("reaction", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(registry.off("reaction", &counter));
        assert_eq!(registry.listener_count("reaction"), 1);
    }

    #[test]
    fn test_off_removes_first_match_by_identity() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        registry.on("timer-sync", a.clone());
        registry.on("timer-sync", b.clone());
        registry.on("timer-sync", a.clone());

        assert!(registry.off("timer-sync", &a));
        registry.invoke("timer-sync", &Value::Null);

        assert_eq!(*log.lock(), vec!["b", "a"]);
    }

    #[test]
    fn test_off_is_idempotent() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&log, "a");
        let never_registered = recorder(&log, "a");

        assert!(!registry.off("unknown-event", &a));

        registry.on("chat-message", a.clone());
        assert!(!registry.off("chat-message", &never_registered));
        assert!(registry.off("chat-message", &a));
        assert!(!registry.off("chat-message", &a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.on("buzzer-locked", listener(|_| panic!("listener failure")));
        registry.on("buzzer-locked", recorder(&log, "b"));

        let failures = registry.invoke("buzzer-locked", &Value::Null);

        assert_eq!(failures, 1);
        assert_eq!(*log.lock(), vec!["b"]);
    }

    #[test]
    fn test_listener_may_modify_registry() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = recorder(&log, "late");

        let registry_clone = Arc::clone(&registry);
        let late_clone = late.clone();
        registry.on(
            "sync-state",
            listener(move |_| registry_clone.on("sync-state", late_clone.clone())),
        );

        // Snapshot semantics: the listener added during dispatch runs next time.
        registry.invoke("sync-state", &Value::Null);
        assert!(log.lock().is_empty());

        registry.invoke("sync-state", &Value::Null);
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[test]
    fn test_invoke_unknown_event() {
        let registry = ListenerRegistry::new();
        assert_eq!(registry.invoke("nothing-here", &Value::Null), 0);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
