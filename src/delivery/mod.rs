// src/delivery/mod.rs
pub mod webhook;

use crate::error::DeliveryError;
use crate::model::Lead;

/// Best-effort, bounded-timeout delivery of one lead to a tenant endpoint.
#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, callback_url: &str, lead: &Lead) -> Result<(), DeliveryError>;
}
