//! Signaling protocol message types.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `OPEN` | Server → Client | Identity confirmed |
//! | `ERROR` | Server → Client | Fatal server error |
//! | `ID-TAKEN` | Server → Client | Identity already in use |
//! | `INVALID-KEY` | Server → Client | API key rejected |
//! | `LEAVE` | Server → Client | Remote peer left |
//! | `EXPIRE` | Server → Client | Relayed offer expired |
//! | `OFFER` / `ANSWER` / `CANDIDATE` | Both | Negotiation relay |
//! | `HEARTBEAT` | Client → Server | Keep-alive |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Wire message and type tag |
//! | `signal` | Outbound signal classification |

// ============================================================================
// Submodules
// ============================================================================

/// Wire message and type tag.
pub mod message;

/// Outbound signal classification and relayed signal payloads.
pub mod signal;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Message, MessageType};
pub use signal::{SignalEvent, classify};
