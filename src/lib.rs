//! Peer Signal - signaling-channel client for peer-to-peer negotiation.
//!
//! This library keeps a persistent WebSocket connection to a rendezvous
//! server, registers a session identity, relays offer/answer/candidate
//! messages between peers and reports the connection lifecycle as typed
//! events. The actual peer connection negotiation is left to the consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ commands ┌───────────────────────────────────┐  WebSocket  ┌──────────┐
//! │   Peer   │─────────►│ driver task                       │◄───────────►│  Server  │
//! │ (handle) │          │  Session ──► Transport ──► Socket │             │          │
//! │          │◄─────────│  dispatch    queue/heartbeat      │             │          │
//! └──────────┘  events  └───────────────────────────────────┘             └──────────┘
//! ```
//!
//! Key design principles:
//!
//! - [`Session`] and [`Transport`] are synchronous state machines, driven by
//!   one task, so handlers never interleave
//! - The socket is injected through [`SocketFactory`], with an in-memory
//!   implementation for deterministic tests
//! - Failures before the first confirmed identity destroy the session;
//!   failures after it only disconnect, so [`Peer::reconnect`] can resume
//!
//! # Quick Start
//!
//! ```no_run
//! use peer_signal::{Peer, Result, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (peer, mut events) = Peer::builder()
//!         .host("localhost")
//!         .port(9000)
//!         .id("alice")
//!         .spawn()?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Open(id) => println!("registered as {id}"),
//!             SessionEvent::Offer(offer) => println!("offer from {:?}", offer.peer),
//!             SessionEvent::Disconnected(_) => peer.reconnect().await?,
//!             SessionEvent::Close => break,
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`peer`] | [`Peer`] handle, builder, options, identity providers |
//! | [`protocol`] | Wire message types |
//! | [`session`] | [`Session`] state machine and events |
//! | [`transport`] | [`Transport`] state machine and sockets |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// Fallible calls return [`Result<T>`]; runtime problems arrive as
/// [`SessionError`] events.
pub mod error;

/// Peer handle and configuration.
///
/// Use [`Peer::builder()`] to configure and spawn a peer.
pub mod peer;

/// Signaling protocol message types.
pub mod protocol;

/// Session identity lifecycle and dispatch.
pub mod session;

/// Signaling transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, ErrorKind, Result, SessionError};

// Peer types
pub use peer::{
    FixedIdentity, GeneratedIdentity, IdentityProvider, Peer, PeerBuilder, PeerStatus,
    SignalOptions,
};

// Protocol types
pub use protocol::{Message, MessageType, SignalEvent};

// Session types
pub use session::{Session, SessionEvent, SessionEvents, SessionState};

// Transport types
pub use transport::{
    MemorySocketFactory, MemorySocketHandle, Socket, SocketFactory, Transport, WebSocketFactory,
};
