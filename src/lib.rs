//! Party Connector - game server event connector for party game clients.
//!
//! This library owns the single persistent connection between a party game
//! client (TV display, team phone, admin panel) and the game server, and
//! turns the server's pushed events into local notifications.
//!
//! # Architecture
//!
//! ```text
//! Game server ──Socket.IO──► Transport ──signal──► Connector
//!                                                     │
//!                                               DispatchBridge
//!                                              ┌──────┴───────┐
//!                                          EventBus      ListenerRegistry
//!                                        (party:<name>)    (on / off)
//! ```
//!
//! Key design principles:
//!
//! - One [`Connector`] per process, constructed explicitly and cloned
//! - The event catalog is an enum; names outside it are never observed
//! - Wire names are normalized (`state_change` becomes `state-change`)
//! - Every notification reaches the bus first, then registered callbacks
//! - Sending is fire-and-forget with no outbound queue
//!
//! # Quick Start
//!
//! ```no_run
//! use party_connector::{ClientEvent, Connector, ConnectorOptions, EventBus, listener};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::new();
//!     let connector = Connector::websocket(bus.clone());
//!
//!     // Direct callback
//!     connector.on("score-update", listener(|payload| {
//!         println!("scores: {}", payload["scores"]);
//!     }));
//!
//!     // Ambient channel, no connector reference needed
//!     let mut events = bus.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{} {}", event.name, event.detail);
//!         }
//!     });
//!
//!     connector.initialize(ConnectorOptions::new().with_endpoint("http://192.168.1.20:13370"));
//!     connector.emit(ClientEvent::JoinTeam, json!({ "team_name": "Quizzards" }));
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connector`] | [`Connector`], [`ConnectionState`], [`ConnectorOptions`] |
//! | [`dispatch`] | [`EventBus`], [`ListenerRegistry`], [`DispatchBridge`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Event catalogs and the Socket.IO frame codec |
//! | [`transport`] | Transport seam and the WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Game server connector and its options.
///
/// Use [`Connector::websocket`] for the default Socket.IO transport.
pub mod connector;

/// Local event dispatch.
///
/// Bus, registry, and the bridge that feeds both.
pub mod dispatch;

/// Error types and result aliases.
///
/// Fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Event catalogs and wire codec.
pub mod protocol;

/// Transport layer.
///
/// The [`transport::Transport`] seam plus the Socket.IO client over WebSocket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connector types
pub use connector::{ConnectionState, Connector, ConnectorOptions};

// Dispatch types
pub use dispatch::{
    DispatchBridge, EventBus, EventSink, Listener, ListenerRegistry, LocalEvent, Notification,
    listener,
};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ClientEvent, ServerEvent};

// Transport types
pub use transport::{Transport, TransportFactory, TransportSignal, WebSocketFactory};
