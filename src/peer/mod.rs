//! Peer handle, configuration and identity acquisition.
//!
//! This module provides the async entry point of the crate.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Peer`] | Cloneable handle to a running session |
//! | [`PeerBuilder`] | Fluent configuration builder |
//! | [`SignalOptions`] | Server location, credentials and tuning |
//! | [`IdentityProvider`] | Source of identities when none is given |
//!
//! # Example
//!
//! ```no_run
//! use peer_signal::{Peer, SessionEvent};
//! use serde_json::json;
//!
//! # async fn example() -> peer_signal::Result<()> {
//! let (peer, mut events) = Peer::builder()
//!     .host("signal.example.com")
//!     .port(9000)
//!     .spawn()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::Open(id) => {
//!             println!("registered as {id}");
//!             peer.signal("bob", json!({ "type": "offer", "sdp": "..." }))?;
//!         }
//!         SessionEvent::Answer(answer) => println!("answer from {:?}", answer.peer),
//!         SessionEvent::Close => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for peer configuration.
pub mod builder;

/// Peer handle and driver task.
pub mod core;

/// Identity acquisition.
pub mod identity;

/// Connection options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Peer, PeerStatus};
pub use builder::PeerBuilder;
pub use identity::{FixedIdentity, GeneratedIdentity, IdentityProvider};
pub use options::{
    CLOUD_HOST, CLOUD_PORT, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_KEY, SignalOptions, random_token,
};
