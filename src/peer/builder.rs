//! Builder pattern for peer configuration.
//!
//! Provides a fluent API for configuring and spawning [`Peer`] instances.
//!
//! # Example
//!
//! ```no_run
//! use peer_signal::Peer;
//!
//! # async fn example() -> peer_signal::Result<()> {
//! let (peer, mut events) = Peer::builder()
//!     .host("signal.example.com")
//!     .port(9000)
//!     .api_key("my-key")
//!     .id("alice")
//!     .spawn()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::SessionEvents;
use crate::transport::SocketFactory;

use super::core::Peer;
use super::identity::{GeneratedIdentity, IdentityProvider};
use super::options::SignalOptions;

// ============================================================================
// PeerBuilder
// ============================================================================

/// Builder for configuring a [`Peer`].
///
/// Use [`Peer::builder()`] to create a new builder.
#[derive(Clone)]
pub struct PeerBuilder {
    /// Explicit identity; skips the identity provider.
    id: Option<String>,
    /// Connection options.
    options: SignalOptions,
    /// Source of identities when none is given.
    identity_provider: Arc<dyn IdentityProvider>,
}

impl Default for PeerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PeerBuilder Implementation
// ============================================================================

impl PeerBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: None,
            options: SignalOptions::new(),
            identity_provider: Arc::new(GeneratedIdentity),
        }
    }

    /// Uses `id` instead of asking the identity provider.
    #[inline]
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SignalOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the server host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options = self.options.with_host(host);
        self
    }

    /// Sets the server port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options = self.options.with_port(port);
        self
    }

    /// Sets the path prefix.
    #[inline]
    #[must_use]
    pub fn path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.options = self.options.with_path_prefix(path_prefix);
        self
    }

    /// Sets the API key.
    #[inline]
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.options = self.options.with_api_key(api_key);
        self
    }

    /// Sets the auth token.
    #[inline]
    #[must_use]
    pub fn auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.options = self.options.with_auth_token(auth_token);
        self
    }

    /// Enables or disables `wss`.
    #[inline]
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.options = self.options.with_secure(secure);
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_heartbeat_interval(interval);
        self
    }

    /// Sets the socket factory.
    #[inline]
    #[must_use]
    pub fn socket_factory(mut self, factory: impl SocketFactory + 'static) -> Self {
        self.options = self.options.with_socket_factory(factory);
        self
    }

    /// Sets the identity provider.
    #[inline]
    #[must_use]
    pub fn identity_provider(mut self, provider: impl IdentityProvider + 'static) -> Self {
        self.identity_provider = Arc::new(provider);
        self
    }

    /// Spawns the peer driver on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options or the explicit id are invalid
    /// - [`Error::Url`] if the endpoint URL cannot be built
    pub fn spawn(self) -> Result<(Peer, SessionEvents)> {
        if let Some(id) = &self.id
            && id.trim().is_empty()
        {
            return Err(Error::config("Peer id must not be empty"));
        }

        Peer::spawn(self.id, self.options, self.identity_provider)
    }
}
