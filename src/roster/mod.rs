// src/roster/mod.rs
//! Tenant roster: loaded once at startup, read-only afterwards.

pub mod file;
pub mod sheets;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::RosterError;
use crate::model::Tenant;

#[async_trait::async_trait]
pub trait RosterSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Tenant>, RosterError>;
    fn name(&self) -> &'static str;
}

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("static regex"));

/// Ads customer ids are often typed as `123-456-7890`; the API wants digits only.
pub fn normalize_account_id(raw: &str) -> String {
    NON_DIGITS.replace_all(raw.trim(), "").into_owned()
}

fn cell(row: &[Value], idx: usize) -> &str {
    row.get(idx).and_then(Value::as_str).unwrap_or_default()
}

/// Map spreadsheet rows positionally onto tenants.
///
/// Row 0 is the header. Columns are `accountID, displayName, callbackURL,
/// status, lastPoll, leadsProcessed, lastError`; only the first three are read,
/// the rest is operator bookkeeping. Rows missing an account id or callback URL
/// are skipped.
pub fn parse_rows(rows: &[Vec<Value>]) -> Vec<Tenant> {
    let mut tenants = Vec::with_capacity(rows.len().saturating_sub(1));
    for (i, row) in rows.iter().enumerate().skip(1) {
        let sheet_row = i + 1;
        let account_id = normalize_account_id(cell(row, 0));
        let display_name = cell(row, 1).trim().to_string();
        let callback_url = cell(row, 2).trim().to_string();

        if account_id.is_empty() || callback_url.is_empty() {
            tracing::warn!(
                row = sheet_row,
                display_name = %display_name,
                "skipping roster row without account id or callback url"
            );
            continue;
        }
        tenants.push(Tenant {
            account_id,
            display_name,
            callback_url,
        });
    }
    tenants
}
