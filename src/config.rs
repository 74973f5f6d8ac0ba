//! Configuration loading and validation
//!
//! Hosts either construct [`TrackingConfig`] programmatically or load it
//! from a TOML file. Configuration is validated when the tracker is
//! built: missing credentials or an invalid exclusion pattern fail
//! closed at startup rather than silently disabling tracking.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// GA4 Measurement Protocol tracking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// GA4 measurement id (required, e.g. "G-XXXXXXXXXX")
    pub measurement_id: String,

    /// GA4 Measurement Protocol API secret (required)
    pub api_secret: String,

    /// Send to the debug-echo endpoint and log outgoing/incoming payloads
    #[serde(default)]
    pub debug_mode: bool,

    /// Requests whose path matches this pattern are never tracked
    #[serde(default)]
    pub ignore_url_regex: Option<String>,

    /// Collector base URL override; defaults to the GA4 endpoint
    /// matching `debug_mode`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Forward the originating request's `User-Agent` on the outbound
    /// call; when false, a fixed library identifier is sent instead
    #[serde(default = "default_send_request_user_agent")]
    pub send_request_user_agent: bool,

    /// Outbound HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_send_request_user_agent() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

impl TrackingConfig {
    /// Create a configuration with the required credentials and defaults
    /// for everything else.
    pub fn new(measurement_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
            debug_mode: false,
            ignore_url_regex: None,
            endpoint: None,
            send_request_user_agent: default_send_request_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: TrackingConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning an error message if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.measurement_id.trim().is_empty() {
            return Err(Error::Config("measurement_id is required".to_string()));
        }
        if self.api_secret.trim().is_empty() {
            return Err(Error::Config("api_secret is required".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        // Compile eagerly so a bad pattern surfaces at startup
        self.ignore_url()?;
        Ok(())
    }

    /// Compile the URL exclusion pattern, if configured.
    pub fn ignore_url(&self) -> Result<Option<Regex>> {
        match &self.ignore_url_regex {
            Some(pattern) => Regex::new(pattern)
                .map(Some)
                .map_err(|e| Error::Config(format!("invalid ignore_url_regex: {}", e))),
            None => Ok(None),
        }
    }
}
