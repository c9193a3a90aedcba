//! Outbound signal classification and inbound signal payloads.
//!
//! The negotiation layer hands the session arbitrary JSON. Only three
//! shapes are relayed:
//!
//! | Shape | Wire type |
//! |-------|-----------|
//! | `{"type": "offer", ...}` | `OFFER` |
//! | `{"type": "answer", ...}` | `ANSWER` |
//! | `{"candidate": {"candidate": "<non-empty>"}, ...}` | `CANDIDATE` |
//!
//! Everything else is ignored.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MessageType;

// ============================================================================
// Classification
// ============================================================================

/// Returns the wire type for an outbound signal, or `None` if the shape is
/// not relayed.
///
/// A candidate is relayed only when `candidate.candidate` is a non-empty
/// string; numbers, booleans and objects there are ignored.
#[must_use]
pub fn classify(data: &Value) -> Option<MessageType> {
    match data.get("type").and_then(Value::as_str) {
        Some("offer") => return Some(MessageType::Offer),
        Some("answer") => return Some(MessageType::Answer),
        _ => {}
    }

    let has_candidate = data
        .get("candidate")
        .and_then(|candidate| candidate.get("candidate"))
        .and_then(Value::as_str)
        .is_some_and(|candidate| !candidate.is_empty());

    has_candidate.then_some(MessageType::Candidate)
}

// ============================================================================
// SignalEvent
// ============================================================================

/// An offer, answer or candidate relayed from a remote peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Remote peer that sent the signal.
    pub peer: Option<String>,
    /// Signal payload as sent by the remote peer.
    pub signal: Value,
}

// ============================================================================
// Tests
// ============================================================================
