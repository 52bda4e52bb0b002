//! Identity gateway contract.
//!
//! The backend's authentication surface, reduced to the one flow the
//! dashboard uses. `provider-firebase` ships the production implementation;
//! tests stub it.

use crate::error::Result;
use crate::types::Session;
use async_trait::async_trait;

/// Password-based identity backend.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Exchange an e-mail/password pair for a session.
    ///
    /// # Errors
    ///
    /// Implementations MUST collapse every credential failure (unknown
    /// account, wrong password, disabled user) into
    /// [`AuthError::InvalidCredentials`](crate::AuthError::InvalidCredentials);
    /// only transport-level failures may surface as anything else.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;
}
