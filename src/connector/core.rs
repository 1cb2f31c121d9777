//! Connector core.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──initialize──► Connecting ──connect──► Connected
//!      ▲                           ▲                       │
//!      │                    reconnect_attempt          disconnect
//!      │                     reconnect()                   │
//!      └───────────────────────────┴───────────────────────┘
//! ```
//!
//! The state only changes on transport signals or explicit
//! [`Connector::disconnect`] / [`Connector::reconnect`] calls. Retrying is
//! the transport's job; the connector only reports what happened.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};

use crate::dispatch::{DispatchBridge, EventBus, Listener, ListenerRegistry};
use crate::error::{Error, Result};
use crate::protocol::{ClientEvent, ServerEvent};
use crate::transport::{
    SignalHandler, Transport, TransportFactory, TransportSignal, WebSocketFactory,
};

use super::options::ConnectorOptions;

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection state as last reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session, and none being attempted.
    #[default]
    Disconnected,
    /// Waiting for the transport to establish a session.
    Connecting,
    /// Session live.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the connector.
pub(crate) struct ConnectorInner {
    /// Opens the transport on initialization.
    factory: Box<dyn TransportFactory>,

    /// The open transport, once initialized.
    transport: RwLock<Option<Box<dyn Transport>>>,

    /// Current connection state. Only the connector writes it.
    state: RwLock<ConnectionState>,

    /// Set once initialization has been claimed.
    initialized: AtomicBool,

    /// Ambient broadcast channel.
    bus: EventBus,

    /// Direct callbacks.
    registry: Arc<ListenerRegistry>,

    /// Fan-out to bus, then registry.
    bridge: DispatchBridge,
}

// ============================================================================
// Connector
// ============================================================================

/// Owner of the game server connection.
///
/// Construct one at application start and hand clones to the modules that
/// need it. Modules that only observe events can hold the [`EventBus`]
/// instead.
///
/// Nothing here returns an error to callers of `send`, `on`, `off`, or the
/// lifecycle methods; failures are logged. [`Connector::try_initialize`] is
/// the one fallible entry point.
#[derive(Clone)]
pub struct Connector {
    /// Shared inner state.
    pub(crate) inner: Arc<ConnectorInner>,
}

// ============================================================================
// Connector - Display
// ============================================================================

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state())
            .field("initialized", &self.is_initialized())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connector - Constructors
// ============================================================================

impl Connector {
    /// Creates a connector that opens its transport through `factory`.
    ///
    /// Nothing connects until [`Connector::initialize`].
    #[must_use]
    pub fn new(factory: impl TransportFactory + 'static, bus: EventBus) -> Self {
        let registry = Arc::new(ListenerRegistry::new());
        let bridge = DispatchBridge::new()
            .with_sink(Arc::new(bus.clone()))
            .with_sink(Arc::clone(&registry) as _);

        Self {
            inner: Arc::new(ConnectorInner {
                factory: Box::new(factory),
                transport: RwLock::new(None),
                state: RwLock::new(ConnectionState::Disconnected),
                initialized: AtomicBool::new(false),
                bus,
                registry,
                bridge,
            }),
        }
    }

    /// Creates a connector using the Socket.IO WebSocket transport.
    #[inline]
    #[must_use]
    pub fn websocket(bus: EventBus) -> Self {
        Self::new(WebSocketFactory, bus)
    }
}

// ============================================================================
// Connector - Lifecycle
// ============================================================================

impl Connector {
    /// Opens the transport.
    ///
    /// Logs and returns if already initialized or if the transport cannot
    /// be opened; the rest of the application keeps running either way.
    pub fn initialize(&self, options: ConnectorOptions) {
        match self.try_initialize(options) {
            Ok(()) => {}
            Err(Error::AlreadyInitialized) => {
                warn!("Connector already initialized, ignoring");
            }
            Err(e) => {
                error!(error = %e, "Connector disabled");
            }
        }
    }

    /// Opens the transport, reporting failure.
    ///
    /// A failed attempt leaves the connector uninitialized so it can be
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] on the second call
    /// - [`Error::Config`] / [`Error::Url`] if `options` are invalid
    /// - [`Error::TransportUnavailable`] if the transport cannot be opened
    pub fn try_initialize(&self, options: ConnectorOptions) -> Result<()> {
        if self
            .inner
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        if let Err(e) = self.open_transport(&options) {
            *self.inner.state.write() = ConnectionState::Disconnected;
            self.inner.initialized.store(false, Ordering::Release);
            return Err(e);
        }

        info!(endpoint = %options.endpoint(), "Connector initialized");
        Ok(())
    }

    fn open_transport(&self, options: &ConnectorOptions) -> Result<()> {
        options.validate()?;

        // Signals may arrive as soon as the transport exists.
        *self.inner.state.write() = ConnectionState::Connecting;

        let weak: Weak<ConnectorInner> = Arc::downgrade(&self.inner);
        let handler: SignalHandler = Arc::new(move |signal| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_signal(signal);
            }
        });

        let transport = self.inner.factory.open(options, handler)?;
        *self.inner.transport.write() = Some(transport);
        Ok(())
    }

    /// Closes the session and stops automatic reconnection.
    ///
    /// The state becomes [`ConnectionState::Disconnected`] immediately.
    pub fn disconnect(&self) {
        let transport = self.inner.transport.read();
        let Some(transport) = transport.as_ref() else {
            debug!("Disconnect ignored, connector not initialized");
            return;
        };

        transport.disconnect();
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Asks the transport to connect again.
    ///
    /// No-op while connected.
    pub fn reconnect(&self) {
        let transport = self.inner.transport.read();
        let Some(transport) = transport.as_ref() else {
            warn!("Reconnect ignored, connector not initialized");
            return;
        };

        if self.is_connected() {
            debug!("Reconnect ignored, already connected");
            return;
        }

        // The transport may report Connect before reconnect() returns.
        self.inner.set_state(ConnectionState::Connecting);
        transport.reconnect();
    }
}

// ============================================================================
// Connector - Outbound
// ============================================================================

impl Connector {
    /// Sends a named message to the server. Fire-and-forget.
    ///
    /// Without a transport the message is dropped. While not connected it
    /// is still handed to the transport, with a warning.
    pub fn send(&self, event: &str, payload: Value) {
        let transport = self.inner.transport.read();
        let Some(transport) = transport.as_ref() else {
            warn!(event = %event, "Connector not initialized, message dropped");
            return;
        };

        let state = self.state();
        if state != ConnectionState::Connected {
            warn!(event = %event, %state, "Sending while not connected");
        }

        if let Err(e) = transport.emit(event, &payload) {
            warn!(event = %event, error = %e, "Send failed");
        }
    }

    /// Sends a catalog event.
    #[inline]
    pub fn emit(&self, event: ClientEvent, payload: Value) {
        self.send(event.wire_name(), payload);
    }
}

// ============================================================================
// Connector - Subscriptions
// ============================================================================

impl Connector {
    /// Registers `listener` for a local event name (e.g. `score-update`).
    #[inline]
    pub fn on(&self, event: impl Into<String>, listener: Listener) {
        self.inner.registry.on(event, listener);
    }

    /// Removes the first registration of `listener` for `event`.
    ///
    /// No-op if it is not registered.
    #[inline]
    pub fn off(&self, event: &str, listener: &Listener) {
        self.inner.registry.off(event, listener);
    }

    /// Number of listeners registered for `event`.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.listener_count(event)
    }
}

// ============================================================================
// Connector - Accessors
// ============================================================================

impl Connector {
    /// Returns `true` while a session is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Returns `true` once the transport has been opened.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// The ambient broadcast channel this connector publishes to.
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// The listener registry behind [`Connector::on`].
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.inner.registry
    }
}

// ============================================================================
// ConnectorInner - Signal Handling
// ============================================================================

impl ConnectorInner {
    fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    /// Applies a transport signal and dispatches it.
    fn handle_signal(&self, signal: TransportSignal) {
        match signal {
            TransportSignal::Connect => {
                self.set_state(ConnectionState::Connected);
                info!("Connected");
                self.dispatch(ServerEvent::Connect, Value::Null);
            }

            TransportSignal::Disconnect { reason } => {
                self.set_state(ConnectionState::Disconnected);
                info!(reason = %reason, "Disconnected");
                self.dispatch(ServerEvent::Disconnect, Value::String(reason));
            }

            TransportSignal::Error { message } => {
                warn!(error = %message, "Connection error");
                self.dispatch(ServerEvent::ConnectError, json!({ "message": message }));
            }

            TransportSignal::ReconnectAttempt { attempt } => {
                self.set_state(ConnectionState::Connecting);
                debug!(attempt, "Reconnecting");
                self.dispatch(ServerEvent::ReconnectAttempt, json!(attempt));
            }

            TransportSignal::ReconnectFailed => {
                self.set_state(ConnectionState::Disconnected);
                error!("Reconnection failed, giving up");
                self.dispatch(ServerEvent::ReconnectFailed, Value::Null);
            }

            TransportSignal::Message { event, payload } => {
                match ServerEvent::from_wire(&event) {
                    Some(known) if !known.is_lifecycle() => self.dispatch(known, payload),
                    Some(_) => trace!(event = %event, "Lifecycle name sent as message, ignored"),
                    None => trace!(event = %event, "Event not in catalog, ignored"),
                }
            }
        }
    }

    fn dispatch(&self, event: ServerEvent, payload: Value) {
        self.bridge.publish(event.local_name(), payload);
    }
}

// ============================================================================
// Tests
// ============================================================================
