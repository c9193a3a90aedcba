//! Session state machine.
//!
//! A [`Session`] owns the identity lifecycle of one peer: it starts the
//! [`Transport`] once an identity is known, translates inbound control
//! messages into [`SessionEvent`]s, relays outbound signals and decides
//! between recoverable and irrecoverable failure.
//!
//! # Recovery Policy
//!
//! An abort before the server ever confirmed an identity destroys the
//! session. An abort after that only disconnects it, so
//! [`Session::reconnect`] can resume with the same identity.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, ErrorKind, Result, SessionError};
use crate::peer::SignalOptions;
use crate::protocol::{Message, MessageType, SignalEvent, classify};
use crate::transport::{SocketNotice, SocketNotices, Transport, TransportError, TransportEvent};

use super::{SessionEvent, SessionState};

// ============================================================================
// Session
// ============================================================================

/// Identity lifecycle and message dispatch for one peer.
pub struct Session {
    /// Normalized options.
    options: SignalOptions,
    /// Transport to the server.
    transport: Transport,
    /// Lifecycle state.
    state: SessionState,
    /// Identity in use; `None` while disconnected.
    identity: Option<String>,
    /// Identity to resume with after a disconnect.
    last_known_identity: Option<String>,
    /// Consumer-facing events; dropped once `Close` has been emitted.
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Session {
    /// Creates a session in the `Connecting` state.
    ///
    /// The transport is not started until [`Session::initialize`] supplies
    /// an identity. Returns the receiver for socket notices; feed each one to
    /// [`Session::handle_notice`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Url`] if the endpoint URL cannot be built
    pub fn new(
        options: SignalOptions,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<(Self, SocketNotices)> {
        let options = options.normalized();
        options.validate()?;

        let endpoint = options.endpoint_url()?;
        let (transport, notices) = Transport::new(
            endpoint,
            options.socket_factory.clone(),
            options.heartbeat_interval,
        );

        let session = Self {
            options,
            transport,
            state: SessionState::Connecting,
            identity: None,
            last_known_identity: None,
            events: Some(events),
        };

        Ok((session, notices))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the identity in use.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Returns the identity a reconnect would use.
    #[inline]
    #[must_use]
    pub fn last_known_id(&self) -> Option<&str> {
        self.last_known_identity.as_deref()
    }

    /// Returns the normalized options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SignalOptions {
        &self.options
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns the deadline of the next heartbeat.
    #[inline]
    #[must_use]
    pub fn next_heartbeat(&self) -> Option<Instant> {
        self.transport.next_heartbeat()
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Starts the transport with `id`.
    ///
    /// Ignored unless the session is connecting.
    pub fn initialize(&mut self, id: impl Into<String>) {
        let id = id.into();

        if self.state != SessionState::Connecting {
            debug!(id = %id, state = %self.state, "Ignoring identity, session not connecting");
            return;
        }

        self.transport.start(&id, &self.options.auth_token);
        self.identity = Some(id);
        self.process_transport_events();
    }

    /// Aborts the session because no identity could be obtained.
    pub fn identity_failed(&mut self, error: &Error) {
        if self.state != SessionState::Connecting {
            debug!(error = %error, state = %self.state, "Ignoring identity failure");
            return;
        }

        self.raise(ErrorKind::ServerError, error.to_string());
        self.process_transport_events();
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Handles a notice from the transport's socket.
    pub fn handle_notice(&mut self, notice: SocketNotice) {
        if self.state.is_destroyed() {
            return;
        }

        self.transport.handle_notice(notice);
        self.process_transport_events();
    }

    /// Handles the heartbeat deadline.
    pub fn handle_heartbeat(&mut self) {
        self.transport.handle_heartbeat();
        self.process_transport_events();
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Relays a signal to `peer`.
    ///
    /// Offers, answers and non-empty ICE candidates are sent; any other shape
    /// is ignored. After a disconnect an [`ErrorKind::Disconnected`] error is
    /// emitted instead.
    pub fn signal(&mut self, peer: &str, data: Value) {
        if self.state.is_disconnected() {
            warn!(peer = %peer, state = %self.state, "Cannot signal after disconnecting from server");
            self.raise(
                ErrorKind::Disconnected,
                "Cannot connect to new Peer after disconnecting from server.",
            );
            return;
        }

        let Some(kind) = classify(&data) else {
            debug!(peer = %peer, "Ignoring signal of unknown shape");
            return;
        };

        self.transport.send(Message::to_peer(kind, peer, data));
        self.process_transport_events();
    }

    /// Drops the connection to the server, keeping the identity for
    /// [`Session::reconnect`].
    pub fn disconnect(&mut self) {
        self.go_disconnected();
        self.process_transport_events();
    }

    /// Ends the session for good.
    ///
    /// [`SessionEvent::Close`] is the last event the session emits.
    pub fn destroy(&mut self) {
        self.go_destroyed();
    }

    /// Reconnects with the last known identity.
    ///
    /// Does nothing while the first connection attempt is still pending.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyDestroyed`] if the session was destroyed
    /// - [`Error::NotDisconnected`] if the session is open
    /// - [`Error::NoIdentity`] if no identity was ever assigned
    pub fn reconnect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Destroyed => Err(Error::AlreadyDestroyed),

            SessionState::Open => Err(Error::not_disconnected(
                self.identity.clone().unwrap_or_default(),
            )),

            SessionState::Connecting => {
                warn!("Initial connection still in progress, nothing to reconnect");
                Ok(())
            }

            SessionState::Disconnected => {
                let id = self.last_known_identity.clone().ok_or(Error::NoIdentity)?;

                debug!(id = %id, "Attempting reconnection to server");

                self.state = SessionState::Connecting;
                self.initialize(id);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn process_transport_events(&mut self) {
        while let Some(event) = self.transport.poll_event() {
            self.handle_transport_event(event);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(message) => self.handle_message(message),

            TransportEvent::Error(TransportError::InvalidMessage) => {
                self.raise(ErrorKind::SocketError, "Invalid message");
            }

            TransportEvent::Error(TransportError::Socket(message)) => {
                self.raise(ErrorKind::Network, message);
            }

            // Only produced by our own close(), mid-transition
            TransportEvent::Disconnected => {
                trace!(state = %self.state, "Transport closed locally");
            }

            TransportEvent::Closed => {
                if self.state.is_disconnected() {
                    return;
                }
                self.raise(
                    ErrorKind::SocketClosed,
                    "Underlying socket is already closed.",
                );
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        let Some(kind) = message.kind.clone() else {
            self.handle_unknown(message);
            return;
        };

        match kind {
            MessageType::Open => self.handle_open(),

            MessageType::Error => {
                let text = message
                    .payload_msg()
                    .unwrap_or("Unknown server error")
                    .to_string();
                self.raise(ErrorKind::ServerError, text);
            }

            MessageType::IdTaken => {
                let text = format!("ID \"{}\" is taken", self.identity.as_deref().unwrap_or_default());
                self.raise(ErrorKind::UnavailableId, text);
            }

            MessageType::InvalidKey => {
                let text = format!("API KEY \"{}\" is invalid", self.options.api_key);
                self.raise(ErrorKind::InvalidKey, text);
            }

            MessageType::Leave => {
                debug!(peer = ?message.src, "Received leave message");
            }

            MessageType::Expire => {
                let peer = message.src.as_deref().unwrap_or_default();
                self.raise(
                    ErrorKind::PeerUnavailable,
                    format!("Could not connect to peer {peer}"),
                );
            }

            MessageType::Offer => self.emit(SessionEvent::Offer(Self::signal_event(message))),
            MessageType::Answer => self.emit(SessionEvent::Answer(Self::signal_event(message))),
            MessageType::Candidate => {
                self.emit(SessionEvent::Candidate(Self::signal_event(message)));
            }

            MessageType::Heartbeat | MessageType::Other(_) => self.handle_unknown(message),
        }
    }

    fn handle_open(&mut self) {
        if self.state != SessionState::Connecting {
            debug!(state = %self.state, "Ignoring OPEN outside of connecting state");
            return;
        }

        let Some(id) = self.identity.clone() else {
            warn!("Received OPEN before an identity was assigned");
            return;
        };

        self.last_known_identity = Some(id.clone());
        self.state = SessionState::Open;

        debug!(id = %id, "Session open");
        self.emit(SessionEvent::Open(id));
    }

    fn handle_unknown(&mut self, message: Message) {
        if message.payload.is_none() {
            warn!(
                peer = ?message.src,
                kind = ?message.kind,
                "You received a malformed message"
            );
            return;
        }

        self.emit(SessionEvent::Message(message));
    }

    fn signal_event(message: Message) -> SignalEvent {
        SignalEvent {
            peer: message.src,
            signal: message.payload.unwrap_or(Value::Null),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Reports an error, aborting the session for fatal kinds.
    fn raise(&mut self, kind: ErrorKind, message: impl Into<String>) {
        if kind.is_fatal() {
            self.abort(kind, message);
        } else {
            self.emit_error(kind, message);
        }
    }

    /// Emits the error, then destroys the session if it never opened or
    /// disconnects it otherwise.
    fn abort(&mut self, kind: ErrorKind, message: impl Into<String>) {
        error!(kind = %kind, "Aborting!");

        self.emit_error(kind, message);

        if self.last_known_identity.is_none() {
            self.go_destroyed();
        } else {
            self.go_disconnected();
        }
    }

    fn go_disconnected(&mut self) {
        if self.state.is_disconnected() {
            return;
        }

        let current = self.identity.take();
        debug!(id = ?current, "Disconnect peer");

        self.state = SessionState::Disconnected;
        self.transport.close();
        self.last_known_identity = current.clone();

        self.emit(SessionEvent::Disconnected(current));
    }

    fn go_destroyed(&mut self) {
        if self.state.is_destroyed() {
            return;
        }

        debug!(id = ?self.identity, "Destroy peer");

        self.go_disconnected();
        self.transport.remove_listeners();
        self.state = SessionState::Destroyed;

        self.emit(SessionEvent::Close);
        self.events = None;
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit_error(&self, kind: ErrorKind, message: impl Into<String>) {
        let error = SessionError::new(kind, message);
        error!(error = %error, "Error");
        self.emit(SessionEvent::Error(error));
    }

    fn emit(&self, event: SessionEvent) {
        let Some(events) = &self.events else {
            return;
        };

        if events.send(event).is_err() {
            debug!("Session event dropped, no listener");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
