// src/error.rs
//! Error taxonomy for the poller.
//!
//! Only [`StartupError`] ever reaches the process boundary. Everything raised
//! while a cycle runs ([`FetchError`], [`DeliveryError`]) is logged and
//! contained by the engine.

use thiserror::Error;

/// Longest response-body excerpt kept in a status error.
pub const BODY_EXCERPT: usize = 512;

/// First [`BODY_EXCERPT`] characters of an error response body.
pub fn body_excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}

/// Fatal errors raised before the first cycle runs.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("error fetching tenants from roster: {0}")]
    Roster(#[from] RosterError),

    #[error("error authenticating to lead source: {0}")]
    Auth(#[from] AuthError),

    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("liveness server: {0}")]
    Liveness(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("create service: {0}")]
    Auth(#[from] AuthError),

    #[error("read spreadsheet: {0}")]
    Api(#[from] ApiError),

    #[error("reading roster file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing roster file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Failure of a single vendor HTTP call (Sheets or Ads).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to obtain access token: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid base url {0:?}")]
    InvalidUrl(String),

    #[error("failed to execute request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TimezoneError {
    #[error("couldn't get timezone: {0}")]
    Query(#[from] ApiError),

    #[error("no timezone found in response")]
    Missing,

    #[error("invalid timezone {0:?}")]
    Unknown(String),
}

/// Tenant-local fetch failure; the tenant is skipped for this cycle only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Timezone(#[from] TimezoneError),

    #[error("fetch leads: {0}")]
    Api(#[from] ApiError),
}

/// Lead-local delivery failure; the lead is dropped for this cycle only.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to marshal lead: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("webhook timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to send request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_excerpt_caps_on_char_boundary() {
        let long = "é".repeat(BODY_EXCERPT + 40);
        let cut = body_excerpt(&long);
        assert_eq!(cut.chars().count(), BODY_EXCERPT);
        assert_eq!(body_excerpt("short"), "short");
    }
}
