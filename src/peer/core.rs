//! Peer handle and driver task.
//!
//! [`Peer`] is a cheap, cloneable handle. All state lives in one spawned
//! driver task that owns the [`Session`] and processes one input at a time:
//!
//! - Commands from [`Peer`] handles
//! - Socket notices from the transport
//! - The heartbeat deadline
//! - The identity provider's answer
//!
//! The driver stops once every handle has been dropped, destroying the
//! session on its way out.

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::{Session, SessionEvents, SessionState};
use crate::transport::SocketNotices;

use super::builder::PeerBuilder;
use super::identity::IdentityProvider;
use super::options::SignalOptions;

// ============================================================================
// PeerStatus
// ============================================================================

/// Snapshot of a session's identity state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    /// Lifecycle state.
    pub state: SessionState,
    /// Identity in use.
    pub id: Option<String>,
    /// Identity a reconnect would use.
    pub last_known_id: Option<String>,
}

impl From<&Session> for PeerStatus {
    fn from(session: &Session) -> Self {
        Self {
            state: session.state(),
            id: session.id().map(str::to_string),
            last_known_id: session.last_known_id().map(str::to_string),
        }
    }
}

// ============================================================================
// PeerCommand
// ============================================================================

/// Internal commands for the driver.
enum PeerCommand {
    /// Relay a signal to a remote peer.
    Signal { peer: String, data: Value },
    /// Disconnect from the server.
    Disconnect,
    /// Destroy the session.
    Destroy,
    /// Reconnect with the last known identity.
    Reconnect {
        reply: oneshot::Sender<Result<()>>,
    },
    /// Report the current status.
    Status { reply: oneshot::Sender<PeerStatus> },
    /// Result of identity acquisition.
    Identity(Result<String>),
}

// ============================================================================
// Peer
// ============================================================================

/// Handle to a signaling session.
///
/// # Thread Safety
///
/// `Peer` is `Send + Sync` and can be cloned and shared across tasks.
#[derive(Clone)]
pub struct Peer {
    /// Channel for sending commands to the driver.
    command_tx: mpsc::UnboundedSender<PeerCommand>,
}

impl Peer {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PeerBuilder {
        PeerBuilder::new()
    }

    /// Creates the session and spawns its driver.
    pub(crate) fn spawn(
        id: Option<String>,
        options: SignalOptions,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Result<(Self, SessionEvents)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (mut session, notices) = Session::new(options, event_tx)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        match id {
            Some(id) => session.initialize(id),
            None => {
                let identity_tx = command_tx.clone();
                tokio::spawn(async move {
                    let result = identity_provider.retrieve_id().await;
                    let _ = identity_tx.send(PeerCommand::Identity(result));
                });
            }
        }

        tokio::spawn(run_driver(session, command_rx, notices));

        Ok((Self { command_tx }, event_rx))
    }

    /// Relays an offer, answer or ICE candidate to `peer`.
    ///
    /// Payloads of any other shape are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver has stopped.
    pub fn signal(&self, peer: impl Into<String>, data: Value) -> Result<()> {
        self.command(PeerCommand::Signal {
            peer: peer.into(),
            data,
        })
    }

    /// Disconnects from the server, keeping the identity for reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver has stopped.
    pub fn disconnect(&self) -> Result<()> {
        self.command(PeerCommand::Disconnect)
    }

    /// Destroys the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver has stopped.
    pub fn destroy(&self) -> Result<()> {
        self.command(PeerCommand::Destroy)
    }

    /// Reconnects with the last known identity.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyDestroyed`] if the session was destroyed
    /// - [`Error::NotDisconnected`] if the session is open
    /// - [`Error::NoIdentity`] if no identity was ever assigned
    /// - [`Error::ConnectionClosed`] if the driver has stopped
    pub async fn reconnect(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(PeerCommand::Reconnect { reply })?;
        rx.await?
    }

    /// Returns a snapshot of the session's identity state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver has stopped.
    pub async fn status(&self) -> Result<PeerStatus> {
        let (reply, rx) = oneshot::channel();
        self.command(PeerCommand::Status { reply })?;
        Ok(rx.await?)
    }

    fn command(&self, command: PeerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Driver loop owning the session.
async fn run_driver(
    mut session: Session,
    mut command_rx: mpsc::UnboundedReceiver<PeerCommand>,
    mut notices: SocketNotices,
) {
    loop {
        let heartbeat = session.next_heartbeat();

        tokio::select! {
            // Commands from Peer handles
            command = command_rx.recv() => {
                match command {
                    Some(command) => handle_command(&mut session, command),
                    None => {
                        debug!("All peer handles dropped");
                        session.destroy();
                        break;
                    }
                }
            }

            // Notices from the current socket
            Some(notice) = notices.recv() => {
                session.handle_notice(notice);
            }

            // Heartbeat deadline
            () = wait_until(heartbeat) => {
                session.handle_heartbeat();
            }
        }
    }

    debug!("Peer driver terminated");
}

/// Applies one command to the session.
fn handle_command(session: &mut Session, command: PeerCommand) {
    match command {
        PeerCommand::Signal { peer, data } => session.signal(&peer, data),
        PeerCommand::Disconnect => session.disconnect(),
        PeerCommand::Destroy => session.destroy(),
        PeerCommand::Reconnect { reply } => {
            let _ = reply.send(session.reconnect());
        }
        PeerCommand::Status { reply } => {
            let _ = reply.send(PeerStatus::from(&*session));
        }
        PeerCommand::Identity(Ok(id)) => session.initialize(id),
        PeerCommand::Identity(Err(e)) => {
            warn!(error = %e, "Identity acquisition failed");
            session.identity_failed(&e);
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
