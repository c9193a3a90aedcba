//! In-memory socket for deterministic tests.
//!
//! [`MemorySocketFactory`] records every socket it opens. Tests drive each
//! socket from the "server side" through a [`MemorySocketHandle`]: complete
//! the handshake, push inbound frames, close it remotely, and inspect what
//! the client wrote.
//!
//! # Example
//!
//! ```ignore
//! let factory = MemorySocketFactory::new();
//! let (peer, mut events) = Peer::builder()
//!     .id("abc")
//!     .socket_factory(factory.clone())
//!     .spawn()?;
//!
//! let socket = factory.wait_for_socket(0).await;
//! socket.open();
//! socket.receive(r#"{"type":"OPEN"}"#);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Message;

use super::socket::{ReadyState, Socket, SocketEvents, SocketFactory};

// ============================================================================
// MemorySocketFactory
// ============================================================================

/// Socket factory that keeps everything in memory.
#[derive(Clone, Default)]
pub struct MemorySocketFactory {
    sockets: Arc<Mutex<Vec<MemorySocketHandle>>>,
    created: Arc<Notify>,
}

impl MemorySocketFactory {
    /// Creates an empty factory.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sockets opened so far.
    #[must_use]
    pub fn socket_count(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Returns the most recently opened socket.
    #[must_use]
    pub fn last(&self) -> Option<MemorySocketHandle> {
        self.sockets.lock().last().cloned()
    }

    /// Waits until the socket at `index` has been opened.
    pub async fn wait_for_socket(&self, index: usize) -> MemorySocketHandle {
        loop {
            let notified = self.created.notified();
            if let Some(handle) = self.sockets.lock().get(index).cloned() {
                return handle;
            }
            notified.await;
        }
    }
}

impl SocketFactory for MemorySocketFactory {
    fn connect(&self, url: &Url, events: SocketEvents) -> Box<dyn Socket> {
        let shared = Arc::new(Mutex::new(MemoryState {
            url: url.clone(),
            ready: ReadyState::Connecting,
            written: Vec::new(),
        }));

        self.sockets.lock().push(MemorySocketHandle {
            shared: Arc::clone(&shared),
            events,
        });
        self.created.notify_waiters();

        Box::new(MemorySocket { shared })
    }
}

// ============================================================================
// MemoryState
// ============================================================================

struct MemoryState {
    url: Url,
    ready: ReadyState,
    written: Vec<String>,
}

// ============================================================================
// MemorySocket
// ============================================================================

/// Client side of an in-memory socket.
struct MemorySocket {
    shared: Arc<Mutex<MemoryState>>,
}

impl Socket for MemorySocket {
    fn send(&mut self, text: String) -> Result<()> {
        let mut state = self.shared.lock();
        if state.ready != ReadyState::Open {
            return Err(Error::ConnectionClosed);
        }
        state.written.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.shared.lock().ready = ReadyState::Closed;
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.lock().ready
    }
}

// ============================================================================
// MemorySocketHandle
// ============================================================================

/// Server side of an in-memory socket.
#[derive(Clone)]
pub struct MemorySocketHandle {
    shared: Arc<Mutex<MemoryState>>,
    events: SocketEvents,
}

impl MemorySocketHandle {
    /// Returns the URL the client connected to.
    #[must_use]
    pub fn url(&self) -> Url {
        self.shared.lock().url.clone()
    }

    /// Returns the socket's ready state.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.shared.lock().ready
    }

    /// Returns `true` once the client closed the socket.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ready_state() == ReadyState::Closed
    }

    /// Completes the handshake and notifies the client.
    pub fn open(&self) {
        self.shared.lock().ready = ReadyState::Open;
        self.events.opened();
    }

    /// Marks the socket open without notifying the client.
    pub fn set_open_silently(&self) {
        self.shared.lock().ready = ReadyState::Open;
    }

    /// Marks the socket closed without notifying the client.
    pub fn set_closed_silently(&self) {
        self.shared.lock().ready = ReadyState::Closed;
    }

    /// Delivers an inbound text frame.
    pub fn receive(&self, text: impl Into<String>) {
        self.events.frame(text);
    }

    /// Delivers an inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the message cannot be serialized.
    pub fn receive_message(&self, message: &Message) -> Result<()> {
        self.events.frame(serde_json::to_string(message)?);
        Ok(())
    }

    /// Reports an I/O failure to the client.
    pub fn fail(&self, message: impl Into<String>) {
        self.events.failed(message);
    }

    /// Closes the socket from the server side.
    pub fn close_remote(&self) {
        self.shared.lock().ready = ReadyState::Closed;
        self.events.closed();
    }

    /// Returns the raw frames the client wrote.
    #[must_use]
    pub fn written(&self) -> Vec<String> {
        self.shared.lock().written.clone()
    }

    /// Returns the frames the client wrote, decoded.
    ///
    /// Frames that do not decode are skipped.
    #[must_use]
    pub fn written_messages(&self) -> Vec<Message> {
        self.shared
            .lock()
            .written
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
