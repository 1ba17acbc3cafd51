// src/source/google_ads.rs
use std::sync::Arc;

use async_trait::async_trait;
use metrics::histogram;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::TokenProvider;
use crate::error::{body_excerpt, ApiError, FetchError};
use crate::model::Lead;
use crate::source::LeadSource;
use crate::window::FetchWindow;

pub const DEFAULT_BASE_URL: &str = "https://googleads.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v22";

const TIMEZONE_QUERY: &str = "SELECT customer.time_zone FROM customer LIMIT 1";

/// One streamed batch of `googleAds:searchStream`.
#[derive(Debug, Deserialize)]
struct SearchBatch<R> {
    #[serde(default = "Vec::new")]
    results: Vec<R>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeadRow {
    local_services_lead: Lead,
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    customer: Customer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    #[serde(default)]
    time_zone: String,
}

/// GAQL selecting leads created inside `window`, newest first.
pub fn leads_query(window: &FetchWindow, max_leads: u32) -> String {
    format!(
        "SELECT \
            local_services_lead.id, \
            local_services_lead.contact_details, \
            local_services_lead.lead_type, \
            local_services_lead.lead_status, \
            local_services_lead.category_id, \
            local_services_lead.service_id, \
            local_services_lead.creation_date_time, \
            local_services_lead.lead_charged \
        FROM local_services_lead \
        WHERE local_services_lead.creation_date_time >= '{}' \
            AND local_services_lead.creation_date_time < '{}' \
        ORDER BY local_services_lead.creation_date_time DESC \
        LIMIT {}",
        window.cutoff_literal(),
        window.now_literal(),
        max_leads
    )
}

/// Flatten a `searchStream` body into leads, keeping vendor order.
pub fn parse_leads(body: &[u8]) -> Result<Vec<Lead>, serde_json::Error> {
    let batches: Vec<SearchBatch<LeadRow>> = serde_json::from_slice(body)?;
    Ok(batches
        .into_iter()
        .flat_map(|b| b.results)
        .map(|r| r.local_services_lead)
        .collect())
}

pub struct GoogleAdsClient {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    developer_token: String,
    manager_id: Option<String>,
    base_url: String,
    api_version: String,
}

impl GoogleAdsClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenProvider>,
        developer_token: impl Into<String>,
        manager_id: Option<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            developer_token: developer_token.into(),
            manager_id: manager_id.filter(|m| !m.is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn search_url(&self, account_id: &str) -> String {
        format!(
            "{}/{}/customers/{}/googleAds:searchStream",
            self.base_url, self.api_version, account_id
        )
    }

    async fn search_stream_raw(&self, account_id: &str, query: &str) -> Result<Vec<u8>, ApiError> {
        let token = self.tokens.access_token().await?;
        let mut req = self
            .http
            .post(self.search_url(account_id))
            .bearer_auth(token)
            .header("developer-token", &self.developer_token)
            .json(&serde_json::json!({ "query": query }));
        if let Some(manager) = &self.manager_id {
            req = req.header("login-customer-id", manager);
        }

        let t0 = std::time::Instant::now();
        let resp = req.send().await.map_err(ApiError::Transport)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(ApiError::Transport)?;
        histogram!("poller_vendor_call_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body_excerpt(&String::from_utf8_lossy(&body)),
            });
        }
        Ok(body.to_vec())
    }

    async fn search_stream<R: DeserializeOwned>(
        &self,
        account_id: &str,
        query: &str,
    ) -> Result<Vec<R>, ApiError> {
        let body = self.search_stream_raw(account_id, query).await?;
        let batches: Vec<SearchBatch<R>> =
            serde_json::from_slice(&body).map_err(ApiError::Decode)?;
        Ok(batches.into_iter().flat_map(|b| b.results).collect())
    }
}

#[async_trait]
impl LeadSource for GoogleAdsClient {
    async fn account_timezone(&self, account_id: &str) -> Result<Option<String>, ApiError> {
        let rows: Vec<CustomerRow> = self.search_stream(account_id, TIMEZONE_QUERY).await?;
        Ok(rows
            .into_iter()
            .map(|r| r.customer.time_zone)
            .find(|tz| !tz.is_empty()))
    }

    async fn fetch_leads(
        &self,
        account_id: &str,
        max_leads: u32,
        window: &FetchWindow,
    ) -> Result<Vec<Lead>, FetchError> {
        tracing::info!(
            account_id,
            cutoff = %window.cutoff_literal(),
            timezone = %window.timezone,
            "fetching leads created after cutoff"
        );
        let query = leads_query(window, max_leads);
        let body = self.search_stream_raw(account_id, &query).await?;
        let leads = parse_leads(&body).map_err(ApiError::Decode)?;
        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_carries_both_window_bounds_and_limit() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0).unwrap();
        let w = FetchWindow::for_instant(
            chrono_tz::America::New_York,
            now,
            std::time::Duration::from_secs(3600),
        );
        let q = leads_query(&w, 100);
        assert!(q.contains(">= '2025-01-15 12:30:00'"), "{q}");
        assert!(q.contains("< '2025-01-15 13:30:00'"), "{q}");
        assert!(q.contains("ORDER BY local_services_lead.creation_date_time DESC"));
        assert!(q.ends_with("LIMIT 100"));
    }

    #[test]
    fn parse_leads_flattens_batches_and_tolerates_empty_ones() {
        let body = br#"[
            {"results": [
                {"localServicesLead": {"id": "2", "contactDetails": {"phoneNumber": "+15550002"}}},
                {"localServicesLead": {"id": "1", "contactDetails": {"email": "one@x.com"}}}
            ]},
            {"fieldMask": "localServicesLead.id"}
        ]"#;
        let leads = parse_leads(body).unwrap();
        let ids: Vec<_> = leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn odd_timestamp_does_not_sink_its_batch() {
        let body = br#"[{"results": [
            {"localServicesLead": {"id": "A", "contactDetails": {"email": "a@x.com"},
                "creationDateTime": "2025-07-04 12:31:00.123456"}},
            {"localServicesLead": {"id": "B", "contactDetails": {"email": "b@x.com"},
                "creationDateTime": "not a timestamp"}},
            {"localServicesLead": {"id": "C", "contactDetails": {"email": "c@x.com"},
                "creationDateTime": "2025-07-04 12:30:00"}}
        ]}]"#;
        let leads = parse_leads(body).unwrap();
        let ids: Vec<_> = leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(leads[0].creation_date_time, "2025-07-04 12:31:00.123456");
        assert!(leads[0].created_at().is_some());
        assert_eq!(leads[1].created_at(), None);
    }

    #[test]
    fn parse_leads_keeps_leads_without_contact() {
        // filtering malformed leads is the engine's job
        let body = br#"[{"results": [{"localServicesLead": {"id": "9"}}]}]"#;
        let leads = parse_leads(body).unwrap();
        assert_eq!(leads.len(), 1);
        assert!(!leads[0].has_contact());
    }
}
