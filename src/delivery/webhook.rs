// src/delivery/webhook.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::DeliverySink;
use crate::error::{body_excerpt, DeliveryError};
use crate::model::Lead;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs each lead as JSON to the tenant's callback URL. No retries.
#[derive(Clone)]
pub struct WebhookSink {
    client: Client,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("lead-poller/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    async fn deliver(&self, callback_url: &str, lead: &Lead) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(lead).map_err(DeliveryError::Encode)?;

        let resp = self
            .client
            .post(callback_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(self.timeout)
                } else {
                    DeliveryError::Transport(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: body_excerpt(&text),
            });
        }

        tracing::debug!(lead_id = %lead.id, status = status.as_u16(), "webhook accepted lead");
        Ok(())
    }
}
