//! Carrier API seams
//!
//! The pipeline components talk to the carrier only through these traits, so
//! tests and alternative transports can stand in for [`CarrierHttpClient`].
//!
//! [`CarrierHttpClient`]: super::CarrierHttpClient

use super::models::{DocumentQuery, ShipDateWindow, TrackingResponse};
use crate::error::AuthError;
use crate::types::{AccessToken, CredentialPurpose, Identifier};
use async_trait::async_trait;

/// Issues access tokens for a credential purpose
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Request a fresh token
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the request cannot be sent, the endpoint
    /// rejects the credentials, or the response carries no token.
    async fn fetch_token(&self, purpose: CredentialPurpose) -> Result<AccessToken, AuthError>;
}

/// Answers tracking queries for a single identifier
#[async_trait]
pub trait TrackingApi: Send + Sync {
    /// Query the current status and scan history
    ///
    /// A response without any result for the identifier is `Ok`; interpreting
    /// it is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-success statuses and
    /// unparseable bodies. All of these are retryable.
    async fn query(
        &self,
        identifier: &Identifier,
        token: &AccessToken,
        window: Option<ShipDateWindow>,
    ) -> crate::Result<TrackingResponse>;
}

/// Answers tracking document queries
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Fetch the first document matching the query
    ///
    /// Returns the base64 payload, or `None` when the carrier has no document
    /// for the shipment.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-success statuses and
    /// unparseable bodies.
    async fn query(&self, query: &DocumentQuery, token: &AccessToken)
    -> crate::Result<Option<String>>;
}
