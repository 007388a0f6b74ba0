//! Configuration types for pod-tracker

use crate::error::{Error, Result};
use crate::types::CredentialPurpose;
use serde::{Deserialize, Serialize};
use std::{ops::Range, path::PathBuf, time::Duration};

const PRODUCTION_HOST: &str = "https://apis.fedex.com";
const SANDBOX_HOST: &str = "https://apis-sandbox.fedex.com";

/// One client id / secret pair for the carrier's OAuth endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// OAuth client id (API key)
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl ClientCredentials {
    /// Whether both halves of the pair are present
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Credential sets keyed by what the token will be used for
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CarrierCredentials {
    /// Credentials for the tracking and document APIs
    #[serde(default)]
    pub tracking: ClientCredentials,

    /// Credentials for the address validation API
    #[serde(default)]
    pub address_validation: ClientCredentials,
}

impl CarrierCredentials {
    /// Load credentials from environment variables
    ///
    /// Reads `POD_TRACKER_CLIENT_ID` / `POD_TRACKER_CLIENT_SECRET` for tracking
    /// and `POD_TRACKER_AV_CLIENT_ID` / `POD_TRACKER_AV_CLIENT_SECRET` for
    /// address validation. Missing variables leave the pair empty.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            tracking: ClientCredentials {
                client_id: var("POD_TRACKER_CLIENT_ID"),
                client_secret: var("POD_TRACKER_CLIENT_SECRET"),
            },
            address_validation: ClientCredentials {
                client_id: var("POD_TRACKER_AV_CLIENT_ID"),
                client_secret: var("POD_TRACKER_AV_CLIENT_SECRET"),
            },
        }
    }

    /// Credential pair for a purpose
    pub fn for_purpose(&self, purpose: CredentialPurpose) -> &ClientCredentials {
        match purpose {
            CredentialPurpose::Tracking => &self.tracking,
            CredentialPurpose::AddressValidation => &self.address_validation,
        }
    }
}

/// Carrier endpoints and account settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarrierConfig {
    /// OAuth token endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Tracking query endpoint
    #[serde(default = "default_tracking_url")]
    pub tracking_url: String,

    /// Tracking document (POD) endpoint
    #[serde(default = "default_document_url")]
    pub document_url: String,

    /// Shipper account number sent with document requests
    #[serde(default)]
    pub account_number: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Client credentials per purpose
    #[serde(default)]
    pub credentials: CarrierCredentials,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            tracking_url: default_tracking_url(),
            document_url: default_document_url(),
            account_number: String::new(),
            timeout: default_request_timeout(),
            credentials: CarrierCredentials::default(),
        }
    }
}

impl CarrierConfig {
    /// Point all three endpoints at the carrier sandbox
    pub fn sandbox(mut self) -> Self {
        self.auth_url = endpoint(SANDBOX_HOST, AUTH_PATH);
        self.tracking_url = endpoint(SANDBOX_HOST, TRACKING_PATH);
        self.document_url = endpoint(SANDBOX_HOST, DOCUMENT_PATH);
        self
    }

    /// Point all three endpoints at another host (test servers, proxies)
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = endpoint(base, AUTH_PATH);
        self.tracking_url = endpoint(base, TRACKING_PATH);
        self.document_url = endpoint(base, DOCUMENT_PATH);
        self
    }
}

/// Path of the OAuth token endpoint relative to the carrier host
pub const AUTH_PATH: &str = "/oauth/token";
/// Path of the tracking endpoint relative to the carrier host
pub const TRACKING_PATH: &str = "/track/v1/trackingnumbers";
/// Path of the tracking document endpoint relative to the carrier host
pub const DOCUMENT_PATH: &str = "/track/v1/trackingdocuments";

fn endpoint(host: &str, path: &str) -> String {
    format!("{}{}", host, path)
}

/// Retry configuration for carrier calls
///
/// Backoff is linear: the sleep after failed attempt `n` is `n * base_delay`,
/// and no sleep follows the final attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay unit for linear backoff (default: 3 seconds)
    #[serde(default = "default_base_delay", with = "duration_millis")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

/// Identifier loop settings and output locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between consecutive identifiers (default: 600 ms)
    #[serde(default = "default_rate_limit_pause", with = "duration_millis")]
    pub rate_limit_pause: Duration,

    /// Directory retrieved POD documents are written to (default: "./pods")
    #[serde(default = "default_pod_dir")]
    pub pod_dir: PathBuf,

    /// Directory the merged document is written to (default: "./results")
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Percent range occupied by the identifier loop (default: 20..80)
    #[serde(default = "default_progress_band")]
    pub progress_band: Range<u8>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate_limit_pause: default_rate_limit_pause(),
            pod_dir: default_pod_dir(),
            results_dir: default_results_dir(),
            progress_band: default_progress_band(),
        }
    }
}

/// Merge engine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Documents per primary-tool batch; larger inputs are merged in two passes (default: 100)
    #[serde(default = "default_primary_batch_size")]
    pub primary_batch_size: usize,

    /// Documents per page-import batch (default: 50)
    #[serde(default = "default_fallback_batch_size")]
    pub fallback_batch_size: usize,

    /// Path to the gs executable (auto-detected if None)
    #[serde(default)]
    pub ghostscript_path: Option<PathBuf>,

    /// Whether to search PATH for gs if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// PDF compatibility level passed to gs (default: "1.4")
    #[serde(default = "default_compatibility_level")]
    pub compatibility_level: String,

    /// Directory for intermediate batch artifacts (default: OS temp dir)
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            primary_batch_size: default_primary_batch_size(),
            fallback_batch_size: default_fallback_batch_size(),
            ghostscript_path: None,
            search_path: true,
            compatibility_level: default_compatibility_level(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// Main configuration for a tracking pipeline
///
/// Fields are organized into sub-configs, one per component:
/// - [`carrier`](CarrierConfig): endpoints, account, credentials
/// - [`retry`](RetryConfig): attempts and backoff for status and POD calls
/// - [`pipeline`](PipelineConfig): rate limiting, output directories, progress band
/// - [`merge`](MergeConfig): batch sizes and external tool discovery
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Carrier API settings
    #[serde(default)]
    pub carrier: CarrierConfig,

    /// Retry settings for carrier calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Identifier loop settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Merge engine settings
    #[serde(default)]
    pub merge: MergeConfig,
}

impl Config {
    /// Check settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("carrier.auth_url", &self.carrier.auth_url),
            ("carrier.tracking_url", &self.carrier.tracking_url),
            ("carrier.document_url", &self.carrier.document_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("invalid URL '{}': {}", value, e), key))?;
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "at least one attempt is required",
                "retry.max_attempts",
            ));
        }
        if self.merge.primary_batch_size == 0 {
            return Err(Error::config(
                "batch size must be positive",
                "merge.primary_batch_size",
            ));
        }
        if self.merge.fallback_batch_size == 0 {
            return Err(Error::config(
                "batch size must be positive",
                "merge.fallback_batch_size",
            ));
        }

        let band = &self.pipeline.progress_band;
        // Authentication reports 10 and merging starts at 95
        if band.is_empty() || band.start < 10 || band.end > 95 {
            return Err(Error::config(
                format!(
                    "progress band {}..{} must be non-empty and within 10..95",
                    band.start, band.end
                ),
                "pipeline.progress_band",
            ));
        }

        Ok(())
    }
}

fn default_auth_url() -> String {
    endpoint(PRODUCTION_HOST, AUTH_PATH)
}

fn default_tracking_url() -> String {
    endpoint(PRODUCTION_HOST, TRACKING_PATH)
}

fn default_document_url() -> String {
    endpoint(PRODUCTION_HOST, DOCUMENT_PATH)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_rate_limit_pause() -> Duration {
    Duration::from_millis(600)
}

fn default_pod_dir() -> PathBuf {
    PathBuf::from("./pods")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_progress_band() -> Range<u8> {
    20..80
}

fn default_primary_batch_size() -> usize {
    100
}

fn default_fallback_batch_size() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_compatibility_level() -> String {
    "1.4".to_string()
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

// Duration serialization helpers
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
