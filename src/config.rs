//! Environment-driven configuration for the credential service.

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Endpoint URL of the credential issuing service.
pub const ENV_HYDRA_URL: &str = "HYDRA_URL";
/// Basic-auth username for the credential issuing service.
pub const ENV_HYDRA_USER: &str = "HYDRA_USER";
/// Basic-auth password for the credential issuing service.
pub const ENV_HYDRA_PASS: &str = "HYDRA_PASS";
/// Set to "false" or "0" to validate the issuer's TLS certificate.
pub const ENV_HYDRA_INSECURE_SKIP_VERIFY: &str = "HYDRA_INSECURE_SKIP_VERIFY";
/// Request timeout in whole seconds; unset means no timeout.
pub const ENV_HYDRA_TIMEOUT_SECS: &str = "HYDRA_TIMEOUT_SECS";

/// Connection settings for the credential issuing service ("Hydra").
#[derive(Debug, Clone)]
pub struct HydraConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate validation on the credential request. Defaults
    /// to true, matching the trust relaxation the service historically
    /// requires for self-signed deployments.
    pub insecure_skip_verify: bool,
    /// Optional request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl HydraConfig {
    /// Read the configuration from environment variables.
    ///
    /// The three connection variables are required; the TLS and timeout
    /// knobs are optional.
    pub fn from_env() -> Result<Self> {
        Ok(HydraConfig {
            endpoint: require_var(ENV_HYDRA_URL)?,
            username: require_var(ENV_HYDRA_USER)?,
            password: require_var(ENV_HYDRA_PASS)?,
            insecure_skip_verify: insecure_skip_verify_from_env(),
            request_timeout: request_timeout_from_env()?,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow!("Required environment variable {} is not set", name))
}

fn insecure_skip_verify_from_env() -> bool {
    match env::var(ENV_HYDRA_INSECURE_SKIP_VERIFY) {
        Ok(value) => {
            let value = value.trim();
            !(value.eq_ignore_ascii_case("false") || value == "0")
        }
        Err(_) => true,
    }
}

fn request_timeout_from_env() -> Result<Option<Duration>> {
    match env::var(ENV_HYDRA_TIMEOUT_SECS) {
        Ok(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} value: {}", ENV_HYDRA_TIMEOUT_SECS, value))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
