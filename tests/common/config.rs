//! Test configuration helpers for loading .env credentials and building test configs

use pod_tracker::Config;
use pod_tracker::config::{CarrierConfig, CarrierCredentials, ClientCredentials};
use std::time::Duration;
use tempfile::TempDir;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config pointing at a mock carrier, with all output under `dir`
///
/// Retries are fast and there is no pause between identifiers. The external
/// merge tool is disabled so runs do not depend on a local Ghostscript.
pub fn mock_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();

    config.carrier = CarrierConfig::default().with_base_url(base_url);
    config.carrier.account_number = "000111222".to_string();
    config.carrier.timeout = Duration::from_secs(5);
    config.carrier.credentials = CarrierCredentials {
        tracking: ClientCredentials {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
        },
        address_validation: ClientCredentials::default(),
    };

    config.retry.max_attempts = 4;
    config.retry.base_delay = Duration::from_millis(5);
    config.pipeline.rate_limit_pause = Duration::ZERO;
    config.pipeline.pod_dir = dir.path().join("pods");
    config.pipeline.results_dir = dir.path().join("results");

    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).ok();
    config.merge.temp_dir = scratch;
    config.merge.ghostscript_path = None;
    config.merge.search_path = false;

    config
}

/// Load sandbox carrier configuration from environment variables
///
/// Required environment variables:
/// - `POD_TRACKER_CLIENT_ID` - OAuth client id
/// - `POD_TRACKER_CLIENT_SECRET` - OAuth client secret
/// - `POD_TRACKER_ACCOUNT` - Shipper account number
///
/// Optional environment variables:
/// - `POD_TRACKER_PRODUCTION` - Use production endpoints instead of the sandbox
pub fn load_live_config(dir: &TempDir) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let credentials = CarrierCredentials::from_env();
    if !credentials.tracking.is_configured() {
        return Err(ConfigError(
            "POD_TRACKER_CLIENT_ID / POD_TRACKER_CLIENT_SECRET not set in environment".to_string(),
        ));
    }
    let account_number = std::env::var("POD_TRACKER_ACCOUNT")
        .map_err(|_| ConfigError("POD_TRACKER_ACCOUNT not set in environment".to_string()))?;

    let carrier = if std::env::var("POD_TRACKER_PRODUCTION").is_ok() {
        CarrierConfig::default()
    } else {
        CarrierConfig::default().sandbox()
    };

    let mut config = Config::default();
    config.carrier = CarrierConfig {
        account_number,
        credentials,
        ..carrier
    };
    config.pipeline.pod_dir = dir.path().join("pods");
    config.pipeline.results_dir = dir.path().join("results");
    config.merge.temp_dir = dir.path().to_path_buf();
    Ok(config)
}

/// Check if live carrier credentials are available
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    CarrierCredentials::from_env().tracking.is_configured()
        && std::env::var("POD_TRACKER_ACCOUNT").is_ok()
}

/// Identifiers to use against the live API, from `POD_TRACKER_IDENTIFIERS`
pub fn live_identifiers() -> Vec<String> {
    dotenvy::dotenv().ok();
    std::env::var("POD_TRACKER_IDENTIFIERS")
        .unwrap_or_default()
        .split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
