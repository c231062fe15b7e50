//! HTTP event collector delivery.

use crate::error::{check_status, FeedError};
use std::time::Duration;
use ubridge_core::config::HecConfig;
use ubridge_core::hec::{encode_batch, EnvelopeOptions};
use ubridge_core::Transformed;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Posts batches of transformed events to a Splunk-compatible collector.
#[derive(Debug, Clone)]
pub struct HecSender {
    http: reqwest::Client,
    url: String,
    token: String,
    envelope: EnvelopeOptions,
}

impl HecSender {
    pub fn new(config: &HecConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            token: config.token.clone(),
            envelope: config.envelope(),
        })
    }

    /// Deliver `events` as one newline-delimited payload.
    ///
    /// Returns the number of events sent; an empty batch sends nothing.
    pub async fn send(&self, events: &[Transformed]) -> Result<usize, FeedError> {
        if events.is_empty() {
            tracing::info!("no logs to send");
            return Ok(0);
        }

        let payload = encode_batch(events, &self.envelope)?;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, format!("Splunk {}", self.token))
            .body(payload)
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => {
                tracing::info!(count = events.len(), "sent logs to event collector");
                Ok(events.len())
            }
            Err(err) => {
                if let FeedError::Status { body, .. } = &err {
                    tracing::debug!(%body, "event collector response body");
                }
                Err(err)
            }
        }
    }
}
