//! Client configuration.
//!
//! `base_url` is fixed at construction and `api_url` is always derived from
//! it; there is no way to set the two independently.

use std::time::Duration;

/// Public deployment of the crop disease detection API.
pub const DEFAULT_BASE_URL: &str = "https://crop-disease-detection-api-0spd.onrender.com";

pub const BASE_URL_ENV: &str = "CROP_API_BASE_URL";
pub const TIMEOUT_ENV: &str = "CROP_API_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_url: String,
    timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let api_url = format!("{base_url}/api");
        Self {
            base_url,
            api_url,
            timeout: None,
        }
    }

    /// Build from `CROP_API_BASE_URL` and `CROP_API_TIMEOUT_SECS`, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV).ok();
        let timeout = std::env::var(TIMEOUT_ENV).ok();
        Self::from_values(base_url.as_deref(), timeout.as_deref())
    }

    fn from_values(base_url: Option<&str>, timeout_secs: Option<&str>) -> Self {
        let config = Self::new(base_url.filter(|u| !u.is_empty()).unwrap_or(DEFAULT_BASE_URL));
        match timeout_secs.map(|raw| (raw, raw.trim().parse::<u64>())) {
            Some((_, Ok(secs))) => config.with_timeout(Duration::from_secs(secs)),
            Some((raw, Err(_))) => {
                tracing::warn!(value = raw, "ignoring invalid {TIMEOUT_ENV}");
                config
            }
            None => config,
        }
    }

    /// Transport timeout applied to every request by `CropApi`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
