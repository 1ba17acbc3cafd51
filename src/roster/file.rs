// src/roster/file.rs
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{normalize_account_id, RosterSource};
use crate::error::RosterError;
use crate::model::Tenant;

/// Local roster file for development: a JSON array of tenants or a TOML file
/// with `[[tenants]]` tables.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RosterSource for FileRoster {
    async fn load(&self) -> Result<Vec<Tenant>, RosterError> {
        let display = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RosterError::Read {
                path: display.clone(),
                source,
            })?;
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let tenants = parse_roster(&content, &ext).map_err(|reason| RosterError::Parse {
            path: display,
            reason,
        })?;
        Ok(clean(tenants))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn parse_roster(s: &str, hint_ext: &str) -> Result<Vec<Tenant>, String> {
    #[derive(serde::Deserialize)]
    struct TomlRoster {
        tenants: Vec<Tenant>,
    }

    if hint_ext == "toml" {
        return toml::from_str::<TomlRoster>(s)
            .map(|r| r.tenants)
            .map_err(|e| e.to_string());
    }
    match serde_json::from_str::<Vec<Tenant>>(s) {
        Ok(v) => Ok(v),
        // Unknown extension: give TOML a chance before failing
        Err(json_err) => toml::from_str::<TomlRoster>(s)
            .map(|r| r.tenants)
            .map_err(|_| json_err.to_string()),
    }
}

fn clean(tenants: Vec<Tenant>) -> Vec<Tenant> {
    tenants
        .into_iter()
        .filter_map(|t| {
            let account_id = normalize_account_id(&t.account_id);
            let callback_url = t.callback_url.trim().to_string();
            if account_id.is_empty() || callback_url.is_empty() {
                tracing::warn!(display_name = %t.display_name, "skipping roster entry without account id or callback url");
                return None;
            }
            Some(Tenant {
                account_id,
                display_name: t.display_name.trim().to_string(),
                callback_url,
            })
        })
        .collect()
}
