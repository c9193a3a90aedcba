//! Signaling transport layer.
//!
//! This module owns the duplex connection to the rendezvous server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  SocketNotice  ┌─────────────────┐   WebSocket   ┌──────────┐
//! │    Transport    │◄───────────────│     Socket      │◄─────────────►│  Server  │
//! │  queue, heart-  │───────────────►│ (tungstenite or │               │          │
//! │  beat, decode   │   send/close   │   in-memory)    │               │          │
//! └─────────────────┘                └─────────────────┘               └──────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::start` - Open a socket for an identity
//! 2. Socket reports open - queued messages flush, heartbeats begin
//! 3. `Transport::send` - Write control messages
//! 4. `Transport::close` or remote close - socket detached, heartbeat cancelled
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Transport state machine |
//! | `connection` | tokio-tungstenite socket |
//! | `memory` | In-memory socket for tests |
//! | `socket` | Socket traits and notices |

// ============================================================================
// Submodules
// ============================================================================

/// Transport state machine.
pub mod channel;

/// WebSocket socket and its event loop.
pub mod connection;

/// In-memory socket for deterministic tests.
pub mod memory;

/// Socket traits and notices.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{ConnectionState, Transport, TransportError, TransportEvent};
pub use connection::{WebSocket, WebSocketFactory};
pub use memory::{MemorySocketFactory, MemorySocketHandle};
pub use socket::{
    ReadyState, Socket, SocketEvent, SocketEvents, SocketFactory, SocketId, SocketNotice,
    SocketNotices,
};
