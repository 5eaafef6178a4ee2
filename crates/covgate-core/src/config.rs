use std::path::Path;

use serde::Deserialize;

use crate::error::{CovgateError, Result};

/// Credentials and endpoint of the target org, read from a JSON file
/// (`config.json` by convention, camelCase keys).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgConfig {
    /// API version, e.g. "60.0"
    pub api_version: String,
    /// Org base URL, e.g. "https://example.my.salesforce.com"
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl OrgConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CovgateError::Config(format!("{}: {e}", path.display())))?;
        let cfg: OrgConfig = serde_json::from_str(&raw)
            .map_err(|e| CovgateError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fail fast on any empty required field.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("apiVersion", &self.api_version),
            ("baseUrl", &self.base_url),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
        ]
        .iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| *k)
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CovgateError::Config(format!(
                "missing required parameters: {}",
                missing.join(", ")
            )))
        }
    }
}
