//! Gateway settings, read from flags or `MPESA_*` environment variables.

use crate::domain::gateway::GatewayCredentials;
use crate::domain::phone::DEFAULT_CALLING_CODE;
use crate::error::{Result, ServiceError};
use clap::Args;
use std::time::Duration;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

#[derive(Args, Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the Daraja API
    #[arg(long, env = "MPESA_BASE_URL", default_value = SANDBOX_BASE_URL)]
    pub base_url: String,

    /// Business shortcode receiving payments
    #[arg(long, env = "MPESA_SHORTCODE")]
    pub shortcode: Option<String>,

    #[arg(long, env = "MPESA_PASSKEY", hide_env_values = true)]
    pub passkey: Option<String>,

    #[arg(long, env = "MPESA_CONSUMER_KEY", hide_env_values = true)]
    pub consumer_key: Option<String>,

    #[arg(long, env = "MPESA_CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: Option<String>,

    /// Public URL the gateway posts payment results to
    #[arg(long, env = "MPESA_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Seconds to wait for any single gateway call
    #[arg(long, env = "MPESA_TIMEOUT_SECS", default_value_t = 20)]
    pub timeout_secs: u64,

    /// Country calling code substituted for a leading trunk `0`
    #[arg(long, env = "MPESA_CALLING_CODE", default_value = DEFAULT_CALLING_CODE)]
    pub calling_code: String,
}

fn required<'a>(value: &'a Option<String>, variable: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("{variable} is not set")))
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn credentials(&self) -> Result<GatewayCredentials> {
        Ok(GatewayCredentials::new(
            required(&self.shortcode, "MPESA_SHORTCODE")?,
            required(&self.passkey, "MPESA_PASSKEY")?,
        ))
    }

    /// `(consumer_key, consumer_secret)` for the OAuth token endpoint.
    pub fn consumer(&self) -> Result<(&str, &str)> {
        Ok((
            required(&self.consumer_key, "MPESA_CONSUMER_KEY")?,
            required(&self.consumer_secret, "MPESA_CONSUMER_SECRET")?,
        ))
    }

    pub fn callback_url(&self) -> Result<&str> {
        required(&self.callback_url, "MPESA_CALLBACK_URL")
    }
}
