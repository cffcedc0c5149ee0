use std::fmt;

use acecloud_api::ClientConfig;
use serde_json::{Map, Value};

use crate::{Error, Result};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Provider-level settings the host supplies once at configure time.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_endpoint: String,
    pub api_key: String,
    pub region: String,
    pub project_id: String,
}

impl ProviderConfig {
    /// Load from env vars:
    ///
    /// - `ACECLOUD_API_ENDPOINT` (required)
    /// - `ACECLOUD_API_KEY` (required)
    /// - `ACECLOUD_REGION` (default: `"us-east-1"`)
    /// - `ACECLOUD_PROJECT_ID` (optional)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::resolve(&Map::new(), |name| std::env::var(name).ok())
    }

    /// Load from the host's provider block, falling back to the environment
    /// for anything the block leaves unset.
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::resolve(attrs, |name| std::env::var(name).ok())
    }

    /// Resolve each setting from `attrs`, then `lookup`, then its default.
    /// Empty strings count as unset.
    pub fn resolve(
        attrs: &Map<String, Value>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let setting = |attr: &str, env: &str| -> Option<String> {
            let set = |v: &String| !v.trim().is_empty();
            attrs
                .get(attr)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .filter(set)
                .or_else(|| lookup(env).filter(set))
        };

        let api_endpoint = setting("api_endpoint", "ACECLOUD_API_ENDPOINT")
            .ok_or_else(|| Error::MissingConfig("api_endpoint (ACECLOUD_API_ENDPOINT)".into()))?;
        let api_key = setting("api_key", "ACECLOUD_API_KEY")
            .ok_or_else(|| Error::MissingConfig("api_key (ACECLOUD_API_KEY)".into()))?;
        let region =
            setting("region", "ACECLOUD_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let project_id = setting("project_id", "ACECLOUD_PROJECT_ID").unwrap_or_default();

        Ok(Self {
            api_endpoint,
            api_key,
            region,
            project_id,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            self.api_endpoint.clone(),
            self.api_key.clone(),
            self.region.clone(),
            self.project_id.clone(),
        )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .finish()
    }
}
