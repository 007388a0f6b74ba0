//! Access token acquisition

use super::traits::AuthService;
use crate::error::AuthError;
use crate::types::{AccessToken, CredentialPurpose};
use std::sync::Arc;
use tracing::{debug, error};

/// Obtains access tokens for a run
///
/// Tokens are requested fresh for every run and never cached; a run lasts far
/// less than a token's lifetime.
#[derive(Clone)]
pub struct TokenProvider {
    service: Arc<dyn AuthService>,
}

impl TokenProvider {
    /// Wrap an auth service
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self { service }
    }

    /// Obtain a token for the given credential purpose
    ///
    /// # Errors
    ///
    /// Returns the service's [`AuthError`] unchanged. Failure here is fatal
    /// for the run.
    pub async fn fetch_token(&self, purpose: CredentialPurpose) -> Result<AccessToken, AuthError> {
        debug!(%purpose, "fetching access token");
        self.service.fetch_token(purpose).await.inspect_err(|e| {
            error!(%purpose, error = %e, "failed to obtain access token");
        })
    }
}
