//! Session lifecycle state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a [`Session`](super::Session).
///
/// ```text
/// Connecting ──OPEN──► Open ──disconnect──► Disconnected ──reconnect──► Connecting
///      │                 │                       │
///      └─────────────────┴───────destroy─────────┴──────────► Destroyed
/// ```
///
/// `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Waiting for an identity or for the server to confirm it.
    #[default]
    Connecting,
    /// Server confirmed the identity.
    Open,
    /// Connection to the server dropped; reconnect is possible.
    Disconnected,
    /// Session ended for good.
    Destroyed,
}

impl SessionState {
    /// Returns `true` if the session is not connected to the server.
    ///
    /// A destroyed session is also disconnected.
    #[inline]
    #[must_use]
    pub const fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Destroyed)
    }

    /// Returns `true` if the session has been destroyed.
    #[inline]
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Returns `true` if the server confirmed the identity.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Disconnected => "disconnected",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
