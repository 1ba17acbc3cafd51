// src/config.rs
//! Process configuration.
//!
//! Credentials come from the environment (a `.env` file is loaded in dev).
//! Operational tuning comes from an optional TOML file with env overrides:
//! 1) $POLLER_CONFIG_PATH
//! 2) config/poller.toml
//! 3) built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::auth::OAuthCredentials;
use crate::engine::{EngineConfig, DEFAULT_MAX_LEADS};
use crate::error::ConfigError;
use crate::health::DEFAULT_PORT;
use crate::source::google_ads::DEFAULT_API_VERSION;

pub const ENV_CONFIG_PATH: &str = "POLLER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/poller.toml";

fn default_interval_secs() -> u64 {
    3600
}
fn default_max_leads() -> u32 {
    DEFAULT_MAX_LEADS
}
fn default_delivery_timeout_secs() -> u64 {
    10
}
fn default_api_timeout_secs() -> u64 {
    30
}
fn default_shutdown_grace_secs() -> u64 {
    5
}
fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Defaults to the interval; never allowed below it.
    #[serde(default)]
    pub lookback_secs: Option<u64>,
    #[serde(default = "default_max_leads")]
    pub max_leads: u32,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_api_version")]
    pub ads_api_version: String,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            lookback_secs: None,
            max_leads: default_max_leads(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            api_timeout_secs: default_api_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            ads_api_version: default_api_version(),
        }
    }
}

impl Tuning {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs.unwrap_or(self.interval_secs))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_leads: self.max_leads,
            lookback: self.lookback(),
        }
    }

    /// Enforce `interval > 0`, `max_leads > 0` and `lookback >= interval`.
    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "interval_secs",
                value: "0".into(),
            });
        }
        if self.max_leads == 0 {
            return Err(ConfigError::Invalid {
                name: "max_leads",
                value: "0".into(),
            });
        }
        if let Some(lb) = self.lookback_secs {
            if lb < self.interval_secs {
                tracing::warn!(
                    lookback_secs = lb,
                    interval_secs = self.interval_secs,
                    "lookback shorter than interval would leave gaps; raising it to the interval"
                );
                self.lookback_secs = Some(self.interval_secs);
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub sheets_refresh_token: Option<String>,
    pub ads_refresh_token: String,
    pub ads_developer_token: String,
    pub ads_manager_id: Option<String>,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    /// Local roster file; replaces the spreadsheet when set.
    pub roster_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_enabled: bool,
    pub tuning: Tuning,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |k: &'static str| get(k).ok_or(ConfigError::Missing(k));

        let roster_path = get("ROSTER_PATH").map(PathBuf::from);
        let sheets_refresh_token = get("GOOGLE_SHEETS_REFRESH_TOKEN");
        let (sheet_id, sheet_name) = if roster_path.is_some() {
            (get("SHEET_ID"), get("SHEET_NAME"))
        } else {
            if sheets_refresh_token.is_none() {
                return Err(ConfigError::Missing("GOOGLE_SHEETS_REFRESH_TOKEN"));
            }
            (Some(require("SHEET_ID")?), Some(require("SHEET_NAME")?))
        };

        let client_id = require("GOOGLE_CLIENT_ID")?;
        let client_secret = require("GOOGLE_CLIENT_SECRET")?;
        let ads_refresh_token = get("GOOGLE_ADS_REFRESH_TOKEN")
            .or_else(|| sheets_refresh_token.clone())
            .ok_or(ConfigError::Missing("GOOGLE_ADS_REFRESH_TOKEN"))?;
        let ads_developer_token = require("GOOGLE_ADS_DEVELOPER_TOKEN")?;
        let ads_manager_id = get("GOOGLE_ADS_MANAGER_ID").map(|m| m.replace('-', ""));

        let port = parse_port(get("PORT").as_deref());
        let metrics_enabled = get("METRICS_ENABLED").is_some_and(|v| v == "1" || v == "true");

        let tuning = load_tuning(&get)?;

        Ok(Self {
            client_id,
            client_secret,
            sheets_refresh_token,
            ads_refresh_token,
            ads_developer_token,
            ads_manager_id,
            sheet_id,
            sheet_name,
            roster_path,
            port,
            metrics_enabled,
            tuning,
        })
    }

    pub fn ads_credentials(&self) -> OAuthCredentials {
        OAuthCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.ads_refresh_token.clone(),
        }
    }

    pub fn sheets_credentials(&self) -> Option<OAuthCredentials> {
        self.sheets_refresh_token
            .as_ref()
            .map(|refresh_token| OAuthCredentials {
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                refresh_token: refresh_token.clone(),
            })
    }
}

/// Invalid ports fall back to the default with a warning.
pub fn parse_port(raw: Option<&str>) -> u16 {
    match raw {
        None => DEFAULT_PORT,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(value = s, "invalid PORT value, using default {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
    }
}

fn load_tuning(get: &dyn Fn(&str) -> Option<String>) -> Result<Tuning, ConfigError> {
    let mut tuning = match get(ENV_CONFIG_PATH) {
        Some(p) => Tuning::load_from(Path::new(&p))?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Tuning::load_from(fallback)?
            } else {
                Tuning::default()
            }
        }
    };

    if let Some(v) = env_number::<u64>(get, "POLL_INTERVAL_SECS")? {
        tuning.interval_secs = v;
    }
    if let Some(v) = env_number::<u64>(get, "LOOKBACK_SECS")? {
        tuning.lookback_secs = Some(v);
    }
    if let Some(v) = env_number::<u32>(get, "MAX_LEADS")? {
        tuning.max_leads = v;
    }
    if let Some(v) = env_number::<u64>(get, "DELIVERY_TIMEOUT_SECS")? {
        tuning.delivery_timeout_secs = v;
    }
    tuning.validate()
}

fn env_number<T: std::str::FromStr>(
    get: &dyn Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(name) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}
