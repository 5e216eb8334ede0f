//! Live-feed client configuration.

use crate::feed::backoff::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the live-feed client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint of the data source, without the token query
    pub url: String,
    /// Delay before the first reconnect, in milliseconds
    pub reconnect_base_delay_ms: u64,
    /// Reconnects attempted before the client gives up
    pub max_reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:{}/api/v1/ws/air-quality", crate::DEFAULT_RELAY_PORT),
            reconnect_base_delay_ms: crate::DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: crate::MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl FeedConfig {
    /// Create a configuration for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the initial reconnect delay.
    pub fn with_reconnect_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_base_delay_ms = delay_ms;
        self
    }

    /// Set the number of reconnect attempts.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Backoff parameters derived from this configuration.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// The URL to dial, with `token` appended as a query parameter.
    pub fn endpoint_with_token(&self, token: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.url, separator, urlencoding::encode(token))
    }
}
