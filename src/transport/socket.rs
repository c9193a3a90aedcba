//! Socket abstraction used by the transport.
//!
//! A [`SocketFactory`] opens a [`Socket`] for an endpoint URL and receives a
//! [`SocketEvents`] notifier. The socket reports open, inbound frames,
//! failures and closure through that notifier. Every notice carries the
//! [`SocketId`] the transport assigned, so notices from a socket the
//! transport has already detached are recognized as stale and ignored.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::error::Result;

// ============================================================================
// SocketId
// ============================================================================

/// Generation number of a socket opened by one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SocketId(u64);

impl SocketId {
    /// Returns the next generation.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw generation number.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

// ============================================================================
// ReadyState
// ============================================================================

/// Connection state of an underlying socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// Handshake in progress.
    #[default]
    Connecting,
    /// Frames can be written.
    Open,
    /// Close requested, not yet complete.
    Closing,
    /// Closed.
    Closed,
}

// ============================================================================
// SocketEvent
// ============================================================================

/// Something that happened on a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// An I/O error occurred. A [`SocketEvent::Closed`] follows.
    Failed(String),
    /// The socket closed.
    Closed,
}

/// A [`SocketEvent`] tagged with the socket it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketNotice {
    /// Originating socket.
    pub socket: SocketId,
    /// What happened.
    pub event: SocketEvent,
}

/// Receiving end of the notices produced by a transport's sockets.
pub type SocketNotices = mpsc::UnboundedReceiver<SocketNotice>;

// ============================================================================
// SocketEvents
// ============================================================================

/// Notifier handed to a socket when it is opened.
///
/// Cloneable so a socket implementation can move it into its I/O task.
#[derive(Debug, Clone)]
pub struct SocketEvents {
    socket: SocketId,
    tx: mpsc::UnboundedSender<SocketNotice>,
}

impl SocketEvents {
    pub(crate) fn new(socket: SocketId, tx: mpsc::UnboundedSender<SocketNotice>) -> Self {
        Self { socket, tx }
    }

    /// Returns the socket this notifier reports for.
    #[inline]
    #[must_use]
    pub fn socket(&self) -> SocketId {
        self.socket
    }

    /// Reports that the handshake completed.
    pub fn opened(&self) {
        self.notify(SocketEvent::Opened);
    }

    /// Reports an inbound text frame.
    pub fn frame(&self, text: impl Into<String>) {
        self.notify(SocketEvent::Frame(text.into()));
    }

    /// Reports an I/O failure.
    pub fn failed(&self, message: impl Into<String>) {
        self.notify(SocketEvent::Failed(message.into()));
    }

    /// Reports that the socket closed.
    pub fn closed(&self) {
        self.notify(SocketEvent::Closed);
    }

    fn notify(&self, event: SocketEvent) {
        let notice = SocketNotice {
            socket: self.socket,
            event,
        };

        // Receiver gone means the session was dropped
        if self.tx.send(notice).is_err() {
            trace!(socket = %self.socket, "Socket notice dropped, receiver closed");
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A full-duplex text socket.
pub trait Socket: Send {
    /// Writes a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket can no longer accept frames.
    fn send(&mut self, text: String) -> Result<()>;

    /// Closes the socket. No further notices are expected afterwards.
    fn close(&mut self);

    /// Returns the socket's current state.
    fn ready_state(&self) -> ReadyState;

    /// Returns `true` if frames can be written.
    fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }
}

/// Opens sockets for the transport.
pub trait SocketFactory: Send + Sync {
    /// Starts opening a socket to `url`.
    ///
    /// The call must not block; progress is reported through `events`.
    fn connect(&self, url: &Url, events: SocketEvents) -> Box<dyn Socket>;
}

// ============================================================================
// Tests
// ============================================================================
