//! Socket.IO protocol types.
//!
//! This module defines the contract between the game server and its
//! clients: which events exist, and how they travel over the wire.
//!
//! # Protocol Overview
//!
//! | Item | Direction | Purpose |
//! |------|-----------|---------|
//! | [`ServerEvent`] | Server → Client | Inbound event catalog |
//! | [`ClientEvent`] | Client → Server | Outbound event catalog |
//! | [`Packet`] | Both | Engine.IO / Socket.IO frame |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `catalog` | Event catalogs and name normalization |
//! | `packet` | Text frame codec |

// ============================================================================
// Submodules
// ============================================================================

/// Event catalogs and name normalization.
pub mod catalog;

/// Engine.IO / Socket.IO frame codec.
pub mod packet;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::{BROADCAST_PREFIX, ClientEvent, ServerEvent, normalize};
pub use packet::{Handshake, Packet};
