//! WebSocket socket backed by tokio-tungstenite.
//!
//! # Event Loop
//!
//! Each socket spawns one tokio task that:
//!
//! - Performs the client handshake
//! - Forwards inbound text frames as [`SocketEvent::Frame`](super::SocketEvent::Frame)
//! - Writes outbound frames queued by [`Socket::send`]
//! - Reports failures and remote closure
//!
//! The task stops on local close, remote close, stream error or when the
//! [`WebSocket`] handle is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Once};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::socket::{ReadyState, Socket, SocketEvents, SocketFactory};

// ============================================================================
// SocketCommand
// ============================================================================

/// Internal commands for the event loop.
enum SocketCommand {
    /// Write a text frame.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Opens tokio-tungstenite client sockets.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

impl SocketFactory for WebSocketFactory {
    fn connect(&self, url: &Url, events: SocketEvents) -> Box<dyn Socket> {
        if url.scheme() == "wss" {
            install_crypto_provider();
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ReadyState::Connecting));

        debug!(socket = %events.socket(), url = %url, "Opening WebSocket");

        tokio::spawn(run_event_loop(
            url.to_string(),
            command_rx,
            Arc::clone(&state),
            events,
        ));

        Box::new(WebSocket { command_tx, state })
    }
}

/// Installs the ring provider for `wss` handshakes unless one is already set.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("TLS crypto provider already installed");
        }
    });
}

// ============================================================================
// WebSocket
// ============================================================================

/// Handle to a socket whose I/O runs on a spawned task.
pub struct WebSocket {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    /// Ready state shared with the event loop.
    state: Arc<Mutex<ReadyState>>,
}

impl Socket for WebSocket {
    fn send(&mut self, text: String) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, ReadyState::Closing | ReadyState::Closed) {
                return;
            }
            *state = ReadyState::Closing;
        }

        let _ = self.command_tx.send(SocketCommand::Close);
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that handles WebSocket I/O for one socket.
async fn run_event_loop(
    url: String,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    state: Arc<Mutex<ReadyState>>,
    events: SocketEvents,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(socket = %events.socket(), error = %e, "WebSocket connect failed");
            *state.lock() = ReadyState::Closed;
            events.failed(e.to_string());
            events.closed();
            return;
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();

    // Close may have been requested during the handshake
    let closed_early = {
        let mut guard = state.lock();
        if *guard == ReadyState::Connecting {
            *guard = ReadyState::Open;
            false
        } else {
            *guard = ReadyState::Closed;
            true
        }
    };

    if closed_early {
        let _ = ws_write.close().await;
        debug!(socket = %events.socket(), "Closed before handshake completed");
        return;
    }

    events.opened();

    let mut closed_locally = false;

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(socket = %events.socket(), len = text.len(), "Frame received");
                        events.frame(text.as_str());
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!(socket = %events.socket(), "WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        error!(socket = %events.socket(), error = %e, "WebSocket error");
                        events.failed(e.to_string());
                        break;
                    }

                    None => {
                        debug!(socket = %events.socket(), "WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the transport
            command = command_rx.recv() => {
                match command {
                    Some(SocketCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(socket = %events.socket(), error = %e, "Failed to write frame");
                        }
                    }

                    Some(SocketCommand::Close) | None => {
                        let _ = ws_write.close().await;
                        closed_locally = true;
                        break;
                    }
                }
            }
        }
    }

    *state.lock() = ReadyState::Closed;

    if !closed_locally {
        events.closed();
    }

    debug!(socket = %events.socket(), "Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio_tungstenite::accept_async;

    use crate::transport::socket::{SocketEvent, SocketId};

    #[tokio::test]
    async fn test_connect_refused_reports_failure_then_close() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let (tx, mut rx) = unbounded_channel();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/peerjs")).expect("url");
        let socket = WebSocketFactory.connect(&url, SocketEvents::new(SocketId::default(), tx));

        let first = rx.recv().await.expect("notice");
        assert!(matches!(first.event, SocketEvent::Failed(_)));
        let second = rx.recv().await.expect("notice");
        assert_eq!(second.event, SocketEvent::Closed);
        assert_eq!(socket.ready_state(), ReadyState::Closed);
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            ws.send(Message::Text(r#"{"type":"OPEN"}"#.to_string().into()))
                .await
                .expect("server send");
            let reply = ws.next().await.expect("frame").expect("ok");
            reply.into_text().expect("text").as_str().to_string()
        });

        let (tx, mut rx) = unbounded_channel();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/peerjs?key=k")).expect("url");
        let mut socket =
            WebSocketFactory.connect(&url, SocketEvents::new(SocketId::default().next(), tx));

        assert_eq!(rx.recv().await.expect("notice").event, SocketEvent::Opened);
        assert!(socket.is_open());

        let frame = rx.recv().await.expect("notice");
        assert_eq!(frame.event, SocketEvent::Frame(r#"{"type":"OPEN"}"#.into()));

        socket
            .send(r#"{"type":"HEARTBEAT"}"#.to_string())
            .expect("send");
        assert_eq!(server.await.expect("join"), r#"{"type":"HEARTBEAT"}"#);

        socket.close();
        assert_eq!(socket.ready_state(), ReadyState::Closing);
    }

    #[tokio::test]
    async fn test_close_during_handshake_never_opens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let (tx, mut rx) = unbounded_channel();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/peerjs")).expect("url");
        let mut socket = WebSocketFactory.connect(&url, SocketEvents::new(SocketId::default(), tx));

        // The handshake cannot complete before the server accepts it
        socket.close();
        assert_eq!(socket.ready_state(), ReadyState::Closing);

        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let after = ws.next().await;
        assert!(!matches!(after, Some(Ok(Message::Text(_)))));

        assert_eq!(socket.ready_state(), ReadyState::Closed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_secure_url_attempts_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        // Hang up without speaking TLS
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            drop(stream);
        });

        let (tx, mut rx) = unbounded_channel();
        let url = Url::parse(&format!("wss://127.0.0.1:{port}/peerjs")).expect("url");
        let socket = WebSocketFactory.connect(&url, SocketEvents::new(SocketId::default(), tx));

        let SocketEvent::Failed(message) = rx.recv().await.expect("notice").event else {
            panic!("expected a handshake failure");
        };
        assert!(!message.contains("TLS support not compiled in"), "{message}");
        assert_eq!(rx.recv().await.expect("notice").event, SocketEvent::Closed);
        assert_eq!(socket.ready_state(), ReadyState::Closed);

        server.await.expect("join");
    }
}
