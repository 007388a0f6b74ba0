//! HTTP transport for the carrier's OAuth, tracking and document endpoints

use super::models::{
    DocumentQuery, DocumentRequest, DocumentResponse, ShipDateWindow, TokenResponse,
    TrackingRequest, TrackingResponse,
};
use super::traits::{AuthService, DocumentApi, TrackingApi};
use crate::config::CarrierConfig;
use crate::error::{AuthError, Error, Result};
use crate::types::{AccessToken, CredentialPurpose, Identifier};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Carrier REST client
///
/// One instance serves all three carrier traits. Requests are JSON with a
/// bearer token, except the token request itself which is a form post.
#[derive(Clone, Debug)]
pub struct CarrierHttpClient {
    http_client: reqwest::Client,
    config: CarrierConfig,
}

impl CarrierHttpClient {
    /// Create a client for the configured endpoints
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: CarrierConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pod-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Configured endpoints
    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    async fn post_json<B, R>(&self, url: &str, token: &AccessToken, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token.secret())
            .json(body)
            .send()
            .await?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.trim().is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AuthService for CarrierHttpClient {
    async fn fetch_token(
        &self,
        purpose: CredentialPurpose,
    ) -> std::result::Result<AccessToken, AuthError> {
        let credentials = self.config.credentials.for_purpose(purpose);
        if !credentials.is_configured() {
            return Err(AuthError::MissingCredentials(purpose.to_string()));
        }

        debug!(%purpose, url = %self.config.auth_url, "requesting access token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        let response = self
            .http_client
            .post(&self.config.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                debug!(expires_in = ?body.expires_in, "access token issued");
                Ok(AccessToken::new(token))
            }
            _ => Err(AuthError::MissingToken),
        }
    }
}

#[async_trait]
impl TrackingApi for CarrierHttpClient {
    async fn query(
        &self,
        identifier: &Identifier,
        token: &AccessToken,
        window: Option<ShipDateWindow>,
    ) -> Result<TrackingResponse> {
        debug!(%identifier, "tracking query");
        let request = TrackingRequest::new(identifier, window);
        self.post_json(&self.config.tracking_url, token, &request)
            .await
    }
}

#[async_trait]
impl DocumentApi for CarrierHttpClient {
    async fn query(&self, query: &DocumentQuery, token: &AccessToken) -> Result<Option<String>> {
        debug!(identifier = %query.identifier, "document query");
        let request = DocumentRequest::from(query);
        let response: DocumentResponse = self
            .post_json(&self.config.document_url, token, &request)
            .await?;
        Ok(response.output.documents.into_iter().next())
    }
}
