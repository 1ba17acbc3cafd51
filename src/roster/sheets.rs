// src/roster/sheets.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_rows, RosterSource};
use crate::auth::TokenProvider;
use crate::error::{body_excerpt, ApiError, RosterError};
use crate::model::Tenant;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads the tenant roster from a Google Sheets tab, columns `A:G`.
pub struct SheetsRoster {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    sheet_id: String,
    sheet_name: String,
    base_url: String,
}

impl SheetsRoster {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenProvider>,
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn range(&self) -> String {
        format!("{}!A:G", self.sheet_name)
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}` with each segment percent-encoded.
    fn values_url(&self) -> Result<reqwest::Url, ApiError> {
        let invalid = || ApiError::InvalidUrl(self.base_url.clone());
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        let range = self.range();
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.sheet_id.as_str(), "values", range.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl RosterSource for SheetsRoster {
    async fn load(&self) -> Result<Vec<Tenant>, RosterError> {
        let token = self.tokens.access_token().await?;
        let url = self.values_url()?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(ApiError::Transport)?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body_excerpt(&String::from_utf8_lossy(&body)),
            }
            .into());
        }
        let range: ValueRange = serde_json::from_slice(&body).map_err(ApiError::Decode)?;
        Ok(parse_rows(&range.values))
    }

    fn name(&self) -> &'static str {
        "google-sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OAuthCredentials;

    fn roster(sheet_name: &str) -> SheetsRoster {
        let tokens = TokenProvider::new(
            reqwest::Client::new(),
            OAuthCredentials {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                refresh_token: "refresh".into(),
            },
        );
        SheetsRoster::new(reqwest::Client::new(), Arc::new(tokens), "sheet-1", sheet_name)
    }

    #[test]
    fn plain_tab_name_keeps_range_readable() {
        let url = roster("Sheet1").values_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-1/values/Sheet1!A:G"
        );
    }

    #[test]
    fn tab_name_is_percent_encoded_into_one_segment() {
        let url = roster("Leads #2/West?").values_url().unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
        assert_eq!(
            url.path(),
            "/v4/spreadsheets/sheet-1/values/Leads%20%232%2FWest%3F!A:G"
        );
    }

    #[test]
    fn unparseable_base_url_is_an_error() {
        let err = roster("Sheet1").with_base_url("not a url").values_url().unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
