//! Identity acquisition.
//!
//! When a peer is built without an explicit id, its driver asks an
//! [`IdentityProvider`] for one before starting the transport. A failure
//! aborts the session with [`ErrorKind::ServerError`](crate::ErrorKind::ServerError).

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// IdentityProvider
// ============================================================================

/// Source of session identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Retrieves a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identity`] if no identity could be obtained.
    async fn retrieve_id(&self) -> Result<String>;
}

// ============================================================================
// GeneratedIdentity
// ============================================================================

/// Generates a random UUID identity locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratedIdentity;

#[async_trait]
impl IdentityProvider for GeneratedIdentity {
    async fn retrieve_id(&self) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

// ============================================================================
// FixedIdentity
// ============================================================================

/// Always returns the same identity.
#[derive(Debug, Clone)]
pub struct FixedIdentity(String);

impl FixedIdentity {
    /// Creates a provider returning `id`.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn retrieve_id(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(Error::identity("empty identity"));
        }
        Ok(self.0.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_identity_is_uuid() {
        let id = GeneratedIdentity.retrieve_id().await.expect("id");
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn test_fixed_identity() {
        let id = FixedIdentity::new("abc").retrieve_id().await.expect("id");
        assert_eq!(id, "abc");

        let err = FixedIdentity::new("").retrieve_id().await.unwrap_err();
        assert!(matches!(err, Error::Identity { .. }));
    }
}
