// src/window.rs
//! Per-tenant fetch window, anchored to the account's own timezone.
//!
//! The vendor stores lead creation times as timezone-naive strings in
//! account-local time, so the window bounds are rendered the same way.
//! The timezone is re-queried on every cycle and never cached.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::time::Duration;

use crate::error::TimezoneError;
use crate::model::naive_ts::FORMAT;
use crate::source::LeadSource;

/// Half-open window `[cutoff, now)` in account-local time.
///
/// The bounds are rendered as naive local literals, so across a DST fall-back
/// hour the range can shrink or even become empty (`01:30` to `01:30`). Leads
/// created in the repeated hour can be missed; the vendor offers no offset-aware
/// filter to avoid it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub timezone: Tz,
    pub cutoff: DateTime<Tz>,
    pub now: DateTime<Tz>,
}

impl FetchWindow {
    /// Pure window computation for a given instant.
    pub fn for_instant(timezone: Tz, now: DateTime<Utc>, lookback: Duration) -> Self {
        let delta = TimeDelta::from_std(lookback).unwrap_or(TimeDelta::MAX);
        let cutoff = now
            .checked_sub_signed(delta)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            timezone,
            cutoff: cutoff.with_timezone(&timezone),
            now: now.with_timezone(&timezone),
        }
    }

    /// Cutoff as a vendor literal, e.g. `2025-03-01 08:15:00`.
    pub fn cutoff_literal(&self) -> String {
        self.cutoff.format(FORMAT).to_string()
    }

    pub fn now_literal(&self) -> String {
        self.now.format(FORMAT).to_string()
    }

    /// Whether an account-local naive timestamp falls inside the window.
    pub fn contains(&self, local: NaiveDateTime) -> bool {
        local >= self.cutoff.naive_local() && local < self.now.naive_local()
    }
}

pub fn parse_timezone(id: &str) -> Result<Tz, TimezoneError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(TimezoneError::Missing);
    }
    id.parse::<Tz>()
        .map_err(|_| TimezoneError::Unknown(id.to_string()))
}

/// Query the account timezone and compute the window ending now.
pub async fn resolve_window(
    source: &dyn LeadSource,
    account_id: &str,
    lookback: Duration,
) -> Result<FetchWindow, TimezoneError> {
    resolve_window_at(source, account_id, lookback, Utc::now()).await
}

pub async fn resolve_window_at(
    source: &dyn LeadSource,
    account_id: &str,
    lookback: Duration,
    now: DateTime<Utc>,
) -> Result<FetchWindow, TimezoneError> {
    let tz_id = source
        .account_timezone(account_id)
        .await?
        .ok_or(TimezoneError::Missing)?;
    let tz = parse_timezone(&tz_id)?;
    Ok(FetchWindow::for_instant(tz, now, lookback))
}
