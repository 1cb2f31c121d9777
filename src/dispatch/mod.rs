//! Local event dispatch.
//!
//! Decouples event producers (the connector) from consumers (UI modules).
//! Every notification reaches two independent sinks, in this order:
//!
//! 1. the [`EventBus`], observable by anyone holding a bus handle
//! 2. the [`ListenerRegistry`], which calls registered callbacks
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Fan-out to sinks |
//! | `bus` | Ambient broadcast channel |
//! | `registry` | Named callback lists |

// ============================================================================
// Submodules
// ============================================================================

/// Notification fan-out.
pub mod bridge;

/// Ambient broadcast channel.
pub mod bus;

/// Listener registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{DispatchBridge, EventSink, Notification};
pub use bus::{DEFAULT_BUS_CAPACITY, EventBus, LocalEvent};
pub use registry::{Listener, ListenerRegistry, listener};
