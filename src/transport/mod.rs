//! Transport layer.
//!
//! The connector depends only on what this module defines: named-message
//! emission, explicit lifecycle control, and a stream of
//! [`TransportSignal`]s flowing back from the transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Connector      │   Transport::emit            │  Game server    │
//! │                 │─────────────────────────────►│                 │
//! │  handle_signal  │◄─────────────────────────────│  Socket.IO      │
//! │                 │   SignalHandler(signal)      │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnection delay policy |
//! | `websocket` | Socket.IO client over tokio-tungstenite |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::connector::ConnectorOptions;
use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Reconnection delay policy.
pub mod backoff;

/// Socket.IO client transport.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::Backoff;
pub use websocket::{WebSocketFactory, WebSocketTransport};

// ============================================================================
// TransportSignal
// ============================================================================

/// Something the transport observed.
///
/// Signals are delivered in the order the transport surfaces them.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// Session established.
    Connect,
    /// Session lost or closed.
    Disconnect {
        /// Why the session ended.
        reason: String,
    },
    /// A connection attempt failed.
    Error {
        /// Failure description.
        message: String,
    },
    /// An automatic reconnection attempt is starting.
    ReconnectAttempt {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// The transport stopped trying: bounded attempts ran out, or an
    /// attempt failed with reconnection disabled.
    ReconnectFailed,
    /// A named event arrived.
    Message {
        /// Wire event name.
        event: String,
        /// Event payload.
        payload: Value,
    },
}

/// Callback receiving transport signals.
///
/// Called from the transport's event loop; must not block.
pub type SignalHandler = Arc<dyn Fn(TransportSignal) + Send + Sync>;

// ============================================================================
// Traits
// ============================================================================

/// An open, persistent connection to the game server.
pub trait Transport: Send + Sync {
    /// Emits a named message. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded or the transport
    /// has shut down.
    fn emit(&self, event: &str, payload: &Value) -> Result<()>;

    /// Closes the session and stops reconnecting.
    fn disconnect(&self);

    /// Starts connecting again after [`Transport::disconnect`] or a
    /// give-up. No-op while a session is live.
    fn reconnect(&self);
}

/// Opens transports.
///
/// The connector calls this exactly once, during initialization.
pub trait TransportFactory: Send + Sync {
    /// Opens a transport that reports to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`](crate::Error::TransportUnavailable)
    /// when the transport cannot exist in this process.
    fn open(
        &self,
        options: &ConnectorOptions,
        handler: SignalHandler,
    ) -> Result<Box<dyn Transport>>;
}
