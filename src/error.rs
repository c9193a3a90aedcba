//! Error types for the signaling client.
//!
//! Two families live here:
//!
//! - [`enum@Error`] is returned synchronously to callers: configuration
//!   problems, misuse of the lifecycle API, and failures of the async handle.
//! - [`SessionError`] travels inside [`SessionEvent::Error`] and describes
//!   runtime conditions reported by the server or the transport.
//!
//! # Usage
//!
//! ```ignore
//! use peer_signal::{Peer, Result};
//!
//! async fn example(peer: &Peer) -> Result<()> {
//!     peer.reconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Lifecycle misuse | [`Error::AlreadyDestroyed`], [`Error::NotDisconnected`], [`Error::NoIdentity`] |
//! | Identity | [`Error::Identity`] |
//! | Connection | [`Error::ConnectionClosed`] |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::ChannelClosed`] |
//!
//! [`SessionEvent::Error`]: crate::session::SessionEvent::Error

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Error returned to callers of the crate API.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when peer options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The session was destroyed and can no longer reach the server.
    #[error("Peer has been destroyed and cannot reconnect")]
    AlreadyDestroyed,

    /// Reconnect requested while the session is still connected.
    #[error("Peer {id} is still connected to the server")]
    NotDisconnected {
        /// Identity the session is currently using.
        id: String,
    },

    /// Reconnect requested but no identity was ever assigned.
    #[error("Cannot reconnect: no identity was ever assigned to this peer")]
    NoIdentity,

    // ========================================================================
    // Identity Errors
    // ========================================================================
    /// Identity acquisition failed.
    ///
    /// Produced by an [`IdentityProvider`](crate::peer::IdentityProvider).
    #[error("Could not get an ID from the server: {message}")]
    Identity {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The peer driver task has stopped.
    ///
    /// Returned by [`Peer`](crate::Peer) methods when the driver task is no
    /// longer running.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-disconnected error.
    #[inline]
    pub fn not_disconnected(id: impl Into<String>) -> Self {
        Self::NotDisconnected { id: id.into() }
    }

    /// Creates an identity acquisition error.
    #[inline]
    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error signals misuse of the lifecycle API.
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyDestroyed | Self::NotDisconnected { .. } | Self::NoIdentity
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::ChannelClosed(_))
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// Category of a runtime error reported through the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server reported an error, or identity acquisition failed.
    ServerError,
    /// The transport rejected an outbound message.
    SocketError,
    /// The underlying socket closed without being asked to.
    SocketClosed,
    /// The requested identity is already in use.
    UnavailableId,
    /// The API key was rejected.
    InvalidKey,
    /// The connection to the server was lost.
    Network,
    /// A remote peer did not answer in time.
    PeerUnavailable,
    /// An operation was attempted after disconnecting.
    Disconnected,
}

impl ErrorKind {
    /// Returns the wire-style name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ServerError => "server-error",
            Self::SocketError => "socket-error",
            Self::SocketClosed => "socket-closed",
            Self::UnavailableId => "unavailable-id",
            Self::InvalidKey => "invalid-key",
            Self::Network => "network",
            Self::PeerUnavailable => "peer-unavailable",
            Self::Disconnected => "disconnected",
        }
    }

    /// Returns `true` for kinds that abort the session when raised.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ServerError | Self::SocketClosed | Self::UnavailableId | Self::InvalidKey
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SessionError
// ============================================================================

/// A typed error carried by [`SessionEvent::Error`](crate::session::SessionEvent::Error).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SessionError {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl SessionError {
    /// Creates a new session error.
    #[inline]
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("heartbeat interval must be non-zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: heartbeat interval must be non-zero"
        );
    }

    #[test]
    fn test_not_disconnected_display() {
        let err = Error::not_disconnected("abc");
        assert_eq!(
            err.to_string(),
            "Peer abc is still connected to the server"
        );
    }

    #[test]
    fn test_is_usage_error() {
        assert!(Error::AlreadyDestroyed.is_usage_error());
        assert!(Error::NoIdentity.is_usage_error());
        assert!(Error::not_disconnected("abc").is_usage_error());
        assert!(!Error::ConnectionClosed.is_usage_error());
        assert!(!Error::config("x").is_usage_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::identity("timeout").is_connection_error());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_connection_error() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        drop(tx);

        let err: Error = rx.await.unwrap_err().into();
        assert!(matches!(err, Error::ChannelClosed(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(ErrorKind::ServerError.is_fatal());
        assert!(ErrorKind::UnavailableId.is_fatal());
        assert!(ErrorKind::InvalidKey.is_fatal());
        assert!(ErrorKind::SocketClosed.is_fatal());
        assert!(!ErrorKind::PeerUnavailable.is_fatal());
        assert!(!ErrorKind::SocketError.is_fatal());
        assert!(!ErrorKind::Network.is_fatal());
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::new(ErrorKind::PeerUnavailable, "Could not connect to peer p2");
        assert_eq!(err.to_string(), "peer-unavailable: Could not connect to peer p2");
    }
}
