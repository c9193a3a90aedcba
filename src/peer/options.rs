//! Connection options for a peer.
//!
//! Provides a type-safe interface for the server location, credentials and
//! transport tuning.
//!
//! # Example
//!
//! ```ignore
//! use peer_signal::SignalOptions;
//!
//! let options = SignalOptions::new()
//!     .with_host("signal.example.com")
//!     .with_port(9000)
//!     .with_path_prefix("myapp")
//!     .with_api_key("k")
//!     .normalized();
//!
//! assert_eq!(options.path_prefix, "/myapp/");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{SocketFactory, WebSocketFactory};

// ============================================================================
// Constants
// ============================================================================

/// Hosted rendezvous server. Always reached over `wss`.
pub const CLOUD_HOST: &str = "0.peerjs.com";

/// Port of the hosted rendezvous server.
pub const CLOUD_PORT: u16 = 443;

/// Shared demo API key.
pub const DEFAULT_KEY: &str = "peerjs";

/// Default interval between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5000);

/// Path segment appended to the prefix.
const ENDPOINT_SUFFIX: &str = "peerjs";

// ============================================================================
// SignalOptions
// ============================================================================

/// Options for connecting to a rendezvous server.
#[derive(Clone)]
pub struct SignalOptions {
    /// Server host name.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Path prefix; normalized to start and end with `/`.
    pub path_prefix: String,

    /// API key sent as `key=`.
    pub api_key: String,

    /// Token sent as `token=`. Random by default.
    pub auth_token: String,

    /// Use `wss` instead of `ws`. Forced for [`CLOUD_HOST`].
    pub secure: bool,

    /// Interval between heartbeats while connected.
    pub heartbeat_interval: Duration,

    /// Opens the underlying sockets.
    pub socket_factory: Arc<dyn SocketFactory>,
}

// ============================================================================
// Constructors
// ============================================================================

impl SignalOptions {
    /// Creates options pointing at the hosted server with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: CLOUD_HOST.to_string(),
            port: CLOUD_PORT,
            path_prefix: "/".to_string(),
            api_key: DEFAULT_KEY.to_string(),
            auth_token: random_token(),
            secure: false,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            socket_factory: Arc::new(WebSocketFactory),
        }
    }
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path_prefix", &self.path_prefix)
            .field("api_key", &self.api_key)
            .field("secure", &self.secure)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SignalOptions {
    /// Sets the server host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the server port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the path prefix.
    #[inline]
    #[must_use]
    pub fn with_path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = path_prefix.into();
        self
    }

    /// Sets the API key.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the auth token.
    #[inline]
    #[must_use]
    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = auth_token.into();
        self
    }

    /// Enables or disables `wss`.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the socket factory.
    #[inline]
    #[must_use]
    pub fn with_socket_factory(mut self, factory: impl SocketFactory + 'static) -> Self {
        self.socket_factory = Arc::new(factory);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl SignalOptions {
    /// Applies normalization: slashes around the path prefix and `wss` for
    /// the hosted server.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.path_prefix.starts_with('/') {
            self.path_prefix.insert(0, '/');
        }
        if !self.path_prefix.ends_with('/') {
            self.path_prefix.push('/');
        }

        if self.host == CLOUD_HOST {
            self.secure = true;
        }

        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the heartbeat
    /// interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("Host must not be empty"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(Error::config("Heartbeat interval must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the URL scheme.
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Builds the base endpoint URL: `{scheme}://{host}:{port}{prefix}peerjs?key={api_key}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the pieces do not form a valid URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}://{}:{}{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.path_prefix,
            ENDPOINT_SUFFIX
        ))?;

        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

/// Generates a random auth token.
#[must_use]
pub fn random_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(11);
    token
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SignalOptions::new();
        assert_eq!(options.host, CLOUD_HOST);
        assert_eq!(options.port, CLOUD_PORT);
        assert_eq!(options.path_prefix, "/");
        assert_eq!(options.api_key, DEFAULT_KEY);
        assert!(!options.secure);
        assert_eq!(options.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(options.auth_token.len(), 11);
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(SignalOptions::new().auth_token, SignalOptions::new().auth_token);
    }

    #[test]
    fn test_path_normalization() {
        let cases = [("", "/"), ("/", "/"), ("app", "/app/"), ("/app", "/app/"), ("app/", "/app/")];

        for (input, expected) in cases {
            let options = SignalOptions::new().with_path_prefix(input).normalized();
            assert_eq!(options.path_prefix, expected, "input {input:?}");
        }
    }

    #[test]
    fn test_cloud_host_forces_secure() {
        let options = SignalOptions::new().normalized();
        assert!(options.secure);

        let options = SignalOptions::new().with_host("x").normalized();
        assert!(!options.secure);
    }

    #[test]
    fn test_endpoint_url() {
        let options = SignalOptions::new()
            .with_host("x")
            .with_port(1)
            .with_api_key("k")
            .normalized();

        let url = options.endpoint_url().expect("url");
        assert_eq!(url.as_str(), "ws://x:1/peerjs?key=k");
    }

    #[test]
    fn test_endpoint_url_with_prefix_and_tls() {
        let options = SignalOptions::new()
            .with_host("signal.example.com")
            .with_port(9000)
            .with_path_prefix("myapp")
            .with_secure(true)
            .normalized();

        let url = options.endpoint_url().expect("url");
        assert_eq!(url.as_str(), "wss://signal.example.com:9000/myapp/peerjs?key=peerjs");
    }

    #[test]
    fn test_validate() {
        assert!(SignalOptions::new().validate().is_ok());
        assert!(SignalOptions::new().with_host(" ").validate().is_err());
        assert!(
            SignalOptions::new()
                .with_heartbeat_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let options = SignalOptions::new().with_auth_token("secret-token");
        assert!(!format!("{options:?}").contains("secret-token"));
    }
}
