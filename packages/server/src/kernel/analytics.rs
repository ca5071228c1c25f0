//! Analytics event capture.
//!
//! Events are delivered to an HTTP collector in a detached task: `capture`
//! returns as soon as the event is accepted for processing, and delivery
//! failures are logged and dropped. The request path must never stall or
//! fail because the collector is slow or down.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::traits::BaseAnalytics;

/// A single analytics event, already scrubbed of anything that must not
/// leave the request path.
#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    /// Event name, e.g. `digest_feedback`.
    pub name: String,
    /// Resolved user id the event is attributed to.
    pub distinct_id: String,
    /// Structured event properties.
    pub properties: serde_json::Value,
}

/// HTTP collector client (PostHog-style capture endpoint).
pub struct HttpAnalytics {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalytics {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl BaseAnalytics for HttpAnalytics {
    async fn capture(&self, event: AnalyticsEvent) -> Result<()> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        tokio::spawn(async move {
            let AnalyticsEvent {
                name,
                distinct_id,
                properties,
            } = event;
            let body = serde_json::json!({
                "api_key": api_key,
                "event": &name,
                "distinct_id": distinct_id,
                "properties": properties,
            });

            match client.post(&endpoint).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        status = %response.status(),
                        event = %name,
                        "Analytics collector rejected event"
                    );
                }
                Err(error) => {
                    warn!(error = %error, event = %name, "Analytics capture failed");
                }
                Ok(_) => {}
            }
        });

        Ok(())
    }
}

/// No-op sink used when no collector endpoint is configured.
pub struct NoopAnalytics;

#[async_trait]
impl BaseAnalytics for NoopAnalytics {
    async fn capture(&self, _event: AnalyticsEvent) -> Result<()> {
        Ok(())
    }
}
