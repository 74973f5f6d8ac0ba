//! Dispatcher for the GA4 Measurement Protocol collector
//!
//! Serializes the built payload and performs exactly one outbound POST.
//! Delivery failure is terminal for that request's events: it is logged
//! as a warning and never propagates past this boundary, so the already
//! sent user response is unaffected. No retries, no queueing.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};

use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::types::Payload;

/// Production collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";

/// Debug-echo endpoint variant; validates payloads and echoes diagnostics.
pub const DEBUG_ENDPOINT: &str = "https://www.google-analytics.com/debug/mp/collect";

/// Fixed identifier sent when the originating request's user agent is
/// not forwarded.
pub const LIBRARY_USER_AGENT: &str = concat!("ga4-serverside/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the GA4 collector.
pub struct Dispatcher {
    http_client: reqwest::Client,
    collect_url: String,
    debug_mode: bool,
    send_request_user_agent: bool,
}

impl Dispatcher {
    /// Create a dispatcher from configuration.
    ///
    /// Returns an error if the configuration is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        config.validate()?;

        let base = config
            .endpoint
            .clone()
            .unwrap_or_else(|| {
                if config.debug_mode {
                    DEBUG_ENDPOINT.to_string()
                } else {
                    DEFAULT_ENDPOINT.to_string()
                }
            })
            .trim_end_matches('/')
            .to_string();

        let collect_url = format!(
            "{}?measurement_id={}&api_secret={}",
            base,
            urlencoding::encode(&config.measurement_id),
            urlencoding::encode(&config.api_secret),
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            collect_url,
            debug_mode: config.debug_mode,
            send_request_user_agent: config.send_request_user_agent,
        })
    }

    /// Send one payload to the collector, best effort.
    ///
    /// `request_user_agent` is the originating request's user agent;
    /// whether it is forwarded depends on configuration. Failures are
    /// logged and swallowed.
    pub async fn dispatch(&self, payload: &Payload, request_user_agent: Option<&str>) {
        if payload.events.is_empty() {
            // A payload with zero events is never dispatched
            return;
        }

        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize analytics payload");
                return;
            }
        };

        let user_agent = if self.send_request_user_agent {
            request_user_agent.unwrap_or(LIBRARY_USER_AGENT)
        } else {
            LIBRARY_USER_AGENT
        };

        if self.debug_mode {
            tracing::debug!(url = %self.collect_url, payload = %body, "Dispatching analytics payload");
        }

        let response = self
            .http_client
            .post(&self.collect_url)
            .header(USER_AGENT, user_agent)
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::warn!(
                        status = status.as_u16(),
                        "Collector rejected analytics payload"
                    );
                }
                if self.debug_mode {
                    match response.text().await {
                        Ok(text) => tracing::debug!(response = %text, "Collector response"),
                        Err(e) => tracing::debug!(error = %e, "Failed to read collector response"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver analytics payload");
            }
        }
    }

    /// Full collection URL including credentials (used by tests and
    /// debug logging).
    pub fn collect_url(&self) -> &str {
        &self.collect_url
    }
}
