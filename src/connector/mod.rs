//! Game server connector.
//!
//! The [`Connector`] owns the one persistent connection to the game server
//! and turns catalog events into local notifications.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Connector`] | Transport owner, lifecycle state, and dispatch entry point |
//! | [`ConnectionState`] | Disconnected / Connecting / Connected |
//! | [`ConnectorOptions`] | Endpoint and reconnection settings |
//!
//! # Example
//!
//! ```no_run
//! use party_connector::{Connector, ConnectorOptions, EventBus, listener};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let connector = Connector::websocket(bus.clone());
//!
//! connector.on("state-change", listener(|payload| {
//!     println!("now showing {}", payload["current_state"]);
//! }));
//!
//! connector.initialize(ConnectorOptions::new());
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Connector implementation.
pub mod core;

/// Connection and reconnection options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{ConnectionState, Connector};
pub use options::{ConnectorOptions, DEFAULT_ENDPOINT, DEFAULT_PATH};
