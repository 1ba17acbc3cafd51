// src/model.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One customer account polled on behalf of. Identity is `account_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub account_id: String,
    pub display_name: String,
    pub callback_url: String,
}

impl Tenant {
    pub fn new(
        account_id: impl Into<String>,
        display_name: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            callback_url: callback_url.into(),
        }
    }
}

/// Vendor lead type. Values this crate doesn't name are kept verbatim in
/// `Other` so webhooks receive exactly what the vendor sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadType {
    PhoneCall,
    Message,
    Booking,
    #[default]
    Unspecified,
    Unknown,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Active,
    Booked,
    Declined,
    Expired,
    Disabled,
    ConsumerDeclined,
    WipedOut,
    #[default]
    Unspecified,
    Unknown,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactDetails {
    pub phone_number: String,
    pub email: String,
    pub consumer_name: String,
}

/// A Local Services lead as returned by the vendor and as POSTed to webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Lead {
    pub id: String,
    pub resource_name: String,
    pub contact_details: ContactDetails,
    pub lead_type: LeadType,
    pub lead_status: LeadStatus,
    pub category_id: String,
    pub service_id: String,
    /// Account-local, timezone-naive creation time, exactly as the vendor
    /// sent it. See [`Lead::created_at`] for the parsed form.
    #[serde(deserialize_with = "null_as_empty")]
    pub creation_date_time: String,
    pub lead_charged: bool,
}

impl Lead {
    /// A lead is only worth forwarding if it carries an email or a phone number.
    pub fn has_contact(&self) -> bool {
        !self.contact_details.email.trim().is_empty()
            || !self.contact_details.phone_number.trim().is_empty()
    }

    /// Parsed creation time; `None` when absent or in a shape we don't read.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        naive_ts::parse(&self.creation_date_time)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Vendor timestamps are `YYYY-MM-DD HH:MM:SS` in account-local time.
pub(crate) mod naive_ts {
    use chrono::{DateTime, NaiveDateTime};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Accepts the vendor format plus `T`-separated, fractional-second and
    /// offset-carrying variants. An offset is dropped, keeping the local clock.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }
}
