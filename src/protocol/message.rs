//! Wire message exchanged with the rendezvous server.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "OFFER",
//!   "payload": { "type": "offer", "sdp": "..." },
//!   "src": "peer-a",
//!   "dst": "peer-b"
//! }
//! ```
//!
//! Absent fields are omitted on the wire, so a heartbeat is exactly
//! `{"type":"HEARTBEAT"}`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// MessageType
// ============================================================================

/// Type tag of a wire [`Message`].
///
/// Unrecognized tags are preserved in [`MessageType::Other`] so that frames
/// from newer servers or peers can be forwarded untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Server accepted the connection and the identity.
    Open,
    /// Server-side error; payload carries `msg`.
    Error,
    /// Requested identity is already in use.
    IdTaken,
    /// API key was not recognized.
    InvalidKey,
    /// A remote peer left.
    Leave,
    /// A relayed offer expired without an answer.
    Expire,
    /// Session description offer.
    Offer,
    /// Session description answer.
    Answer,
    /// ICE candidate.
    Candidate,
    /// Keep-alive.
    Heartbeat,
    /// Any other tag.
    Other(String),
}

impl MessageType {
    /// Returns the wire string for this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Error => "ERROR",
            Self::IdTaken => "ID-TAKEN",
            Self::InvalidKey => "INVALID-KEY",
            Self::Leave => "LEAVE",
            Self::Expire => "EXPIRE",
            Self::Offer => "OFFER",
            Self::Answer => "ANSWER",
            Self::Candidate => "CANDIDATE",
            Self::Heartbeat => "HEARTBEAT",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "OPEN" => Self::Open,
            "ERROR" => Self::Error,
            "ID-TAKEN" => Self::IdTaken,
            "INVALID-KEY" => Self::InvalidKey,
            "LEAVE" => Self::Leave,
            "EXPIRE" => Self::Expire,
            "OFFER" => Self::Offer,
            "ANSWER" => Self::Answer,
            "CANDIDATE" => Self::Candidate,
            "HEARTBEAT" => Self::Heartbeat,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// A control message on the signaling channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message type. `None` only for malformed frames.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageType>,

    /// Opaque JSON payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Originating peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// Destination peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
}

impl Message {
    /// Creates a message of the given type with no payload.
    #[inline]
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Creates a keep-alive message.
    #[inline]
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::new(MessageType::Heartbeat)
    }

    /// Creates a message addressed to `dst` carrying `payload`.
    #[inline]
    #[must_use]
    pub fn to_peer(kind: MessageType, dst: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: Some(kind),
            payload: Some(payload),
            src: None,
            dst: Some(dst.into()),
        }
    }

    /// Sets the payload.
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the originating peer.
    #[inline]
    #[must_use]
    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    /// Returns `payload.msg` as a string, if present.
    #[must_use]
    pub fn payload_msg(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("msg"))
            .and_then(Value::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
