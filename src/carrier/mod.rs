//! Carrier API access
//!
//! Three components sit on top of the carrier's REST endpoints:
//!
//! - [`TokenProvider`]: client-credentials OAuth, one token per run
//! - [`TrackingStatusClient`]: status and exception reason for one identifier
//! - [`PodRetriever`]: signed proof-of-delivery download for delivered shipments
//!
//! Each component depends on a trait ([`AuthService`], [`TrackingApi`],
//! [`DocumentApi`]) rather than on HTTP directly. [`CarrierHttpClient`]
//! implements all three against the real endpoints.
//!
//! ```no_run
//! use pod_tracker::carrier::{CarrierHttpClient, TokenProvider, TrackingStatusClient};
//! use pod_tracker::config::Config;
//! use pod_tracker::progress::ProgressReporter;
//! use pod_tracker::types::{CredentialPurpose, Identifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> pod_tracker::Result<()> {
//! let config = Config::default();
//! let client = Arc::new(CarrierHttpClient::new(config.carrier.clone())?);
//!
//! let token = TokenProvider::new(client.clone())
//!     .fetch_token(CredentialPurpose::Tracking)
//!     .await?;
//! let status = TrackingStatusClient::new(client, config.retry.clone())
//!     .get_status(&Identifier::new("794612345678"), &token, None, &ProgressReporter::detached())
//!     .await;
//! println!("{}: {} {}", status.identifier, status.status, status.reason);
//! # Ok(())
//! # }
//! ```

mod auth;
mod http;
pub mod models;
mod pod;
mod tracking;
mod traits;

pub use auth::TokenProvider;
pub use http::CarrierHttpClient;
pub use pod::PodRetriever;
pub use tracking::{NOT_FOUND_REASON, TrackingStatusClient, derive_reason};
pub use traits::{AuthService, DocumentApi, TrackingApi};

use crate::config::CarrierConfig;
use crate::error::Result;
use std::sync::Arc;

/// The carrier collaborators a pipeline needs, behind their traits
#[derive(Clone)]
pub struct CarrierServices {
    /// Token issuer
    pub auth: Arc<dyn AuthService>,
    /// Tracking queries
    pub tracking: Arc<dyn TrackingApi>,
    /// Document queries
    pub documents: Arc<dyn DocumentApi>,
}

impl CarrierServices {
    /// All three services backed by one HTTP client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn http(config: &CarrierConfig) -> Result<Self> {
        let client = Arc::new(CarrierHttpClient::new(config.clone())?);
        Ok(Self {
            auth: client.clone(),
            tracking: client.clone(),
            documents: client,
        })
    }
}
