// src/source/mod.rs
pub mod google_ads;

use crate::error::{ApiError, FetchError};
use crate::model::Lead;
use crate::window::FetchWindow;

/// Vendor lead source. One implementation talks to Google Ads; tests use stubs.
#[async_trait::async_trait]
pub trait LeadSource: Send + Sync {
    /// IANA timezone identifier configured on the account, e.g. `America/Chicago`.
    /// `Ok(None)` means the vendor answered but carried no timezone.
    async fn account_timezone(&self, account_id: &str) -> Result<Option<String>, ApiError>;

    /// Leads created inside `window`, newest first, at most `max_leads`.
    async fn fetch_leads(
        &self,
        account_id: &str,
        max_leads: u32,
        window: &FetchWindow,
    ) -> Result<Vec<Lead>, FetchError>;
}
