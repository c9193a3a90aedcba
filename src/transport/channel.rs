//! Signaling transport state machine.
//!
//! [`Transport`] owns one socket at a time, queues messages until the socket
//! is addressable, keeps the connection alive with heartbeats, decodes
//! inbound frames and reports what happened as [`TransportEvent`]s.
//!
//! The transport never performs I/O on its own: socket notices are fed in
//! through [`Transport::handle_notice`] and the heartbeat deadline is driven
//! from outside through [`Transport::handle_heartbeat`]. Events are buffered
//! and drained with [`Transport::poll_event`].
//!
//! # States
//!
//! ```text
//! Idle ──start──► Connecting ──opened──► Open
//!   │                 │                   │
//!   └─────close───────┴──close / closed───┴──► Disconnected ──start──► Connecting
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

use crate::protocol::Message;

use super::socket::{
    Socket, SocketEvent, SocketEvents, SocketFactory, SocketId, SocketNotice, SocketNotices,
};

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection state of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never started.
    #[default]
    Idle,
    /// Socket opened, handshake pending.
    Connecting,
    /// Socket open, heartbeats running.
    Open,
    /// Closed locally or by the remote end.
    Disconnected,
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Errors raised by the transport itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// An outbound message had no type.
    #[error("Invalid message")]
    InvalidMessage,

    /// The socket reported an I/O failure.
    #[error("Socket failure: {0}")]
    Socket(String),
}

/// Something the owner of a [`Transport`] needs to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A decoded inbound message.
    Message(Message),
    /// A transport-level error.
    Error(TransportError),
    /// The transport was closed locally.
    Disconnected,
    /// The socket closed without being asked to.
    Closed,
}

// ============================================================================
// Transport
// ============================================================================

/// Transport to the rendezvous server.
pub struct Transport {
    /// Base endpoint including the API key. Derived once.
    endpoint: Url,
    /// Opens sockets.
    factory: Arc<dyn SocketFactory>,
    /// Interval between heartbeats.
    heartbeat_interval: Duration,
    /// Current connection state.
    state: ConnectionState,
    /// Identity the transport was started with.
    identity: Option<String>,
    /// Current socket, if any.
    socket: Option<Box<dyn Socket>>,
    /// Generation of the current socket; notices from other generations are stale.
    socket_id: SocketId,
    /// Messages waiting for the socket to open.
    queue: VecDeque<Message>,
    /// Deadline of the next heartbeat.
    heartbeat: Option<Instant>,
    /// Sender handed to sockets for their notices.
    notice_tx: mpsc::UnboundedSender<SocketNotice>,
    /// Buffered events for the owner.
    events: VecDeque<TransportEvent>,
    /// Whether events are buffered at all.
    listening: bool,
}

impl Transport {
    /// Creates a transport for `endpoint`.
    ///
    /// Returns the receiver on which socket notices arrive; feed each one to
    /// [`Transport::handle_notice`].
    #[must_use]
    pub fn new(
        endpoint: Url,
        factory: Arc<dyn SocketFactory>,
        heartbeat_interval: Duration,
    ) -> (Self, SocketNotices) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let transport = Self {
            endpoint,
            factory,
            heartbeat_interval,
            state: ConnectionState::Idle,
            identity: None,
            socket: None,
            socket_id: SocketId::default(),
            queue: VecDeque::new(),
            heartbeat: None,
            notice_tx,
            events: VecDeque::new(),
            listening: true,
        };

        (transport, notice_rx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the number of queued messages.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns the deadline of the next heartbeat, if one is scheduled.
    #[inline]
    #[must_use]
    pub fn next_heartbeat(&self) -> Option<Instant> {
        self.heartbeat
    }

    /// Returns `true` if the current socket can accept frames.
    #[must_use]
    pub fn is_socket_open(&self) -> bool {
        self.socket.as_ref().is_some_and(|socket| socket.is_open())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Opens a socket for `identity`.
    ///
    /// Does nothing if a socket already exists or the transport is
    /// connecting or open.
    pub fn start(&mut self, identity: &str, token: &str) {
        self.identity = Some(identity.to_string());

        if self.socket.is_some()
            || matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Open
            )
        {
            debug!(id = %identity, "Transport already started");
            return;
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", identity)
            .append_pair("token", token);

        self.socket_id = self.socket_id.next();
        let events = SocketEvents::new(self.socket_id, self.notice_tx.clone());

        debug!(id = %identity, socket = %self.socket_id, "Starting transport");

        self.socket = Some(self.factory.connect(&url, events));
        self.state = ConnectionState::Connecting;
    }

    /// Sends a message.
    ///
    /// Best effort: messages are queued until the socket first opens and
    /// silently dropped once the transport is disconnected or the socket is
    /// not writable.
    pub fn send(&mut self, message: Message) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        if self.identity.is_none()
            || matches!(self.state, ConnectionState::Idle | ConnectionState::Connecting)
        {
            trace!(queued = self.queue.len() + 1, "Queueing message");
            self.queue.push_back(message);
            return;
        }

        if message.kind.is_none() {
            self.emit(TransportEvent::Error(TransportError::InvalidMessage));
            return;
        }

        let Some(socket) = self.socket.as_mut().filter(|socket| socket.is_open()) else {
            debug!(kind = ?message.kind, "Socket not open, dropping message");
            return;
        };

        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize message");
                return;
            }
        };

        if let Err(e) = socket.send(text) {
            warn!(error = %e, "Failed to write message");
        }
    }

    /// Closes the transport.
    ///
    /// Idempotent. Detaches the socket, cancels the heartbeat and emits
    /// [`TransportEvent::Disconnected`].
    pub fn close(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.cleanup();
        self.state = ConnectionState::Disconnected;
        self.emit(TransportEvent::Disconnected);
    }

    /// Drops buffered events and stops buffering new ones.
    pub fn remove_listeners(&mut self) {
        self.listening = false;
        self.events.clear();
    }

    /// Takes the next buffered event.
    pub fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    // ========================================================================
    // Socket Notices
    // ========================================================================

    /// Handles a notice from a socket.
    ///
    /// Notices from sockets other than the current one are ignored.
    pub fn handle_notice(&mut self, notice: SocketNotice) {
        if self.socket.is_none() || notice.socket != self.socket_id {
            trace!(socket = %notice.socket, "Ignoring stale socket notice");
            return;
        }

        match notice.event {
            SocketEvent::Opened => self.on_open(),
            SocketEvent::Frame(text) => self.on_frame(&text),
            SocketEvent::Failed(message) => {
                debug!(error = %message, "Socket failure");
                self.emit(TransportEvent::Error(TransportError::Socket(message)));
            }
            SocketEvent::Closed => self.on_close(),
        }
    }

    /// Sends a heartbeat if one is due and schedules the next.
    pub fn handle_heartbeat(&mut self) {
        if self.heartbeat.take().is_none() {
            return;
        }

        if !self.is_socket_open() {
            debug!("Cannot send heartbeat, because socket closed");
            return;
        }

        self.send(Message::heartbeat());
        self.schedule_heartbeat();
    }

    fn on_open(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Open;

        // Snapshot first so anything re-queued lands in the fresh queue
        let queued = mem::take(&mut self.queue);
        debug!(flushed = queued.len(), "Socket open");

        for message in queued {
            self.send(message);
        }

        self.schedule_heartbeat();
    }

    fn on_frame(&mut self, text: &str) {
        match serde_json::from_str::<Message>(text) {
            Ok(message) => {
                trace!(kind = ?message.kind, "Server message received");
                self.emit(TransportEvent::Message(message));
            }
            Err(e) => {
                debug!(error = %e, frame = %text, "Invalid server message");
            }
        }
    }

    fn on_close(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        debug!(socket = %self.socket_id, "Socket closed");

        self.cleanup();
        self.state = ConnectionState::Disconnected;
        self.emit(TransportEvent::Closed);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn schedule_heartbeat(&mut self) {
        self.heartbeat = Some(Instant::now() + self.heartbeat_interval);
    }

    fn cleanup(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        // Bump the generation so late notices from the old socket are stale
        self.socket_id = self.socket_id.next();
        self.heartbeat = None;
    }

    fn emit(&mut self, event: TransportEvent) {
        if self.listening {
            self.events.push_back(event);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::protocol::MessageType;
    use crate::transport::memory::{MemorySocketFactory, MemorySocketHandle};

    const INTERVAL: Duration = Duration::from_millis(5000);

    fn transport() -> (Transport, SocketNotices, MemorySocketFactory) {
        let factory = MemorySocketFactory::new();
        let endpoint = Url::parse("ws://x:1/peerjs?key=k").expect("url");
        let (transport, notices) = Transport::new(endpoint, Arc::new(factory.clone()), INTERVAL);
        (transport, notices, factory)
    }

    fn pump(transport: &mut Transport, notices: &mut SocketNotices) {
        while let Ok(notice) = notices.try_recv() {
            transport.handle_notice(notice);
        }
    }

    fn drain(transport: &mut Transport) -> Vec<TransportEvent> {
        std::iter::from_fn(|| transport.poll_event()).collect()
    }

    fn open(
        transport: &mut Transport,
        notices: &mut SocketNotices,
        factory: &MemorySocketFactory,
    ) -> MemorySocketHandle {
        transport.start("abc", "tok");
        let socket = factory.last().expect("socket");
        socket.open();
        pump(transport, notices);
        socket
    }

    fn offer(n: usize) -> Message {
        Message::to_peer(MessageType::Offer, format!("peer{n}"), json!({ "n": n }))
    }

    #[test]
    fn test_start_builds_url() {
        let (mut transport, _notices, factory) = transport();
        transport.start("abc", "tok");

        let socket = factory.last().expect("socket");
        assert_eq!(socket.url().as_str(), "ws://x:1/peerjs?key=k&id=abc&token=tok");
        assert_eq!(transport.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut transport, _notices, factory) = transport();
        transport.start("abc", "tok");
        transport.start("abc", "tok");

        assert_eq!(factory.socket_count(), 1);
    }

    #[test]
    fn test_restart_after_close_opens_new_socket() {
        let (mut transport, mut notices, factory) = transport();
        open(&mut transport, &mut notices, &factory);
        transport.close();
        transport.start("abc", "tok");

        assert_eq!(factory.socket_count(), 2);
        assert_eq!(transport.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_queue_flushes_in_order_on_open() {
        let (mut transport, mut notices, factory) = transport();
        transport.send(offer(1));
        transport.start("abc", "tok");
        transport.send(offer(2));
        transport.send(offer(3));
        assert_eq!(transport.queued(), 3);

        let socket = factory.last().expect("socket");
        socket.open();
        pump(&mut transport, &mut notices);

        let dsts: Vec<_> = socket
            .written_messages()
            .into_iter()
            .filter_map(|m| m.dst)
            .collect();
        assert_eq!(dsts, vec!["peer1", "peer2", "peer3"]);
        assert_eq!(transport.queued(), 0);
        assert!(transport.next_heartbeat().is_some());
    }

    #[test]
    fn test_send_after_open_writes_immediately() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        transport.send(offer(7));
        assert_eq!(socket.written_messages(), vec![offer(7)]);
    }

    #[test]
    fn test_send_without_type_raises_error() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        transport.send(Message::default());

        assert_eq!(
            drain(&mut transport),
            vec![TransportEvent::Error(TransportError::InvalidMessage)]
        );
        assert!(socket.written().is_empty());
    }

    #[test]
    fn test_send_on_unwritable_socket_drops_silently() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);
        socket.set_closed_silently();

        transport.send(offer(1));

        assert!(drain(&mut transport).is_empty());
        assert!(socket.written().is_empty());
    }

    #[test]
    fn test_send_after_close_is_noop() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);
        transport.close();
        drain(&mut transport);

        transport.send(offer(1));
        transport.send(Message::default());

        assert!(drain(&mut transport).is_empty());
        assert!(socket.written().is_empty());
        assert_eq!(transport.queued(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        transport.close();
        transport.close();

        assert_eq!(drain(&mut transport), vec![TransportEvent::Disconnected]);
        assert!(socket.is_closed());
        assert!(transport.next_heartbeat().is_none());
    }

    #[test]
    fn test_remote_close_is_idempotent() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        socket.close_remote();
        socket.close_remote();
        pump(&mut transport, &mut notices);
        transport.close();

        assert_eq!(drain(&mut transport), vec![TransportEvent::Closed]);
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_no_events_after_close() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);
        transport.close();
        drain(&mut transport);

        socket.set_open_silently();
        socket.receive(r#"{"type":"OPEN"}"#);
        socket.open();
        socket.close_remote();
        pump(&mut transport, &mut notices);
        transport.handle_heartbeat();

        assert!(drain(&mut transport).is_empty());
        assert!(socket.written().is_empty());
    }

    #[test]
    fn test_open_after_close_does_not_flush() {
        let (mut transport, mut notices, factory) = transport();
        transport.start("abc", "tok");
        transport.send(offer(1));
        transport.close();

        let socket = factory.last().expect("socket");
        socket.open();
        pump(&mut transport, &mut notices);

        assert!(socket.written().is_empty());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_frame_decoding() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        socket.receive("not json");
        socket.receive(r#"{"type":"OPEN"}"#);
        pump(&mut transport, &mut notices);

        assert_eq!(
            drain(&mut transport),
            vec![TransportEvent::Message(Message::new(MessageType::Open))]
        );
    }

    #[test]
    fn test_socket_failure_reported() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);

        socket.fail("connection reset");
        pump(&mut transport, &mut notices);

        assert_eq!(
            drain(&mut transport),
            vec![TransportEvent::Error(TransportError::Socket(
                "connection reset".into()
            ))]
        );
    }

    #[test]
    fn test_heartbeat_sends_and_reschedules() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);
        let first = transport.next_heartbeat().expect("scheduled");

        transport.handle_heartbeat();

        assert_eq!(socket.written(), vec![r#"{"type":"HEARTBEAT"}"#.to_string()]);
        let second = transport.next_heartbeat().expect("rescheduled");
        assert!(second >= first);
    }

    #[test]
    fn test_heartbeat_stops_when_socket_not_open() {
        let (mut transport, mut notices, factory) = transport();
        let socket = open(&mut transport, &mut notices, &factory);
        socket.set_closed_silently();

        transport.handle_heartbeat();

        assert!(socket.written().is_empty());
        assert!(transport.next_heartbeat().is_none());
        assert!(drain(&mut transport).is_empty());
    }

    #[test]
    fn test_remove_listeners() {
        let (mut transport, mut notices, factory) = transport();
        open(&mut transport, &mut notices, &factory);
        transport.remove_listeners();

        transport.close();

        assert!(transport.poll_event().is_none());
    }

    proptest! {
        #[test]
        fn prop_pre_open_sends_flush_in_call_order(
            before_start in 0usize..8,
            after_start in 0usize..8,
        ) {
            let (mut transport, mut notices, factory) = transport();

            for n in 0..before_start {
                transport.send(offer(n));
            }
            transport.start("abc", "tok");
            for n in before_start..before_start + after_start {
                transport.send(offer(n));
            }

            let socket = factory.last().expect("socket");
            prop_assert!(socket.written().is_empty());

            socket.open();
            pump(&mut transport, &mut notices);

            let expected: Vec<_> = (0..before_start + after_start).map(offer).collect();
            prop_assert_eq!(socket.written_messages(), expected);
        }
    }
}
