//! Session identity lifecycle and message dispatch.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | State machine owning the transport |
//! | [`SessionState`] | Lifecycle state |
//! | [`SessionEvent`] | Events delivered to the consumer |

// ============================================================================
// Submodules
// ============================================================================

/// Session state machine.
pub mod core;

/// Consumer-facing events.
pub mod event;

/// Lifecycle state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Session;
pub use event::{SessionEvent, SessionEvents};
pub use state::SessionState;
