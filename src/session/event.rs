//! Events emitted by a session to its consumer.
//!
//! | Event | When |
//! |-------|------|
//! | `Open` | Server confirmed the identity |
//! | `Disconnected` | Connection to the server was dropped |
//! | `Close` | Session destroyed |
//! | `Error` | Server or transport reported a problem |
//! | `Offer` / `Answer` / `Candidate` | A remote peer relayed a signal |
//! | `Message` | Unrecognized message type with a payload |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::error::{ErrorKind, SessionError};
use crate::protocol::{Message, SignalEvent};

// ============================================================================
// SessionEvent
// ============================================================================

/// A lifecycle or signaling event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Server confirmed the identity.
    Open(String),
    /// Connection to the server dropped. Carries the identity that was active.
    Disconnected(Option<String>),
    /// Session destroyed. Always the last event.
    Close,
    /// A typed error.
    Error(SessionError),
    /// A remote peer sent an offer.
    Offer(SignalEvent),
    /// A remote peer sent an answer.
    Answer(SignalEvent),
    /// A remote peer sent an ICE candidate.
    Candidate(SignalEvent),
    /// A message of a type this client does not interpret.
    Message(Message),
}

impl SessionEvent {
    /// Returns the error kind if this is an error event.
    #[inline]
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(error) => Some(error.kind),
            _ => None,
        }
    }
}

/// Receiving end of a session's events.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;
