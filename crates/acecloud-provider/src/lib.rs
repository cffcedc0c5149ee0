//! Lifecycle adapter between an orchestration host and the AceCloud API.
//!
//! The host drives each resource through create/read/update/delete and
//! hands over plain JSON state ([`ResourceData`]). Resources translate that
//! state through [`mapper`] into typed requests for
//! [`acecloud_api::AceCloudClient`] and write the results back.

pub mod config;
pub mod key_pair;
pub mod mapper;
pub mod state;
pub mod vm;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use acecloud_api::AceCloudClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use config::ProviderConfig;
pub use state::ResourceData;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("acecloud api error: {0}")]
    Api(#[from] acecloud_api::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("malformed resource attributes: {0}")]
    InvalidConfig(String),

    #[error("missing provider setting: {0}")]
    MissingConfig(String),

    #[error("invalid resource state: {0}")]
    InvalidState(String),

    #[error("unknown resource type: {0}")]
    UnknownResource(String),
}

impl Error {
    /// Whether the remote object behind this error is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Resource types this provider manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "acecloud_vm")]
    Vm,
    #[serde(rename = "acecloud_key_pair")]
    KeyPair,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vm => "acecloud_vm",
            Self::KeyPair => "acecloud_key_pair",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "acecloud_vm" | "vm" => Ok(Self::Vm),
            "acecloud_key_pair" | "key_pair" => Ok(Self::KeyPair),
            other => Err(Error::UnknownResource(other.to_string())),
        }
    }
}

/// The four verbs the host calls for every resource.
///
/// Not-found from the API is never an error for `read`, `update` or
/// `delete`: the id is cleared instead so the host knows the object is gone.
#[async_trait]
pub trait ResourceLifecycle: Send + Sync + 'static {
    /// Create the remote object and record its id.
    async fn create(&self, data: &mut ResourceData) -> Result<()>;

    /// Refresh computed attributes from the remote object.
    async fn read(&self, data: &mut ResourceData) -> Result<()>;

    /// Converge the remote object with a changed configuration.
    async fn update(&self, data: &mut ResourceData) -> Result<()>;

    /// Destroy the remote object. Succeeds if it is already gone.
    async fn delete(&self, data: &mut ResourceData) -> Result<()>;

    fn kind(&self) -> ResourceKind;
}

/// Every resource type wired to one shared, configured client.
#[derive(Clone)]
pub struct ProviderRegistry {
    resources: HashMap<ResourceKind, Arc<dyn ResourceLifecycle>>,
}

impl ProviderRegistry {
    /// Look up the lifecycle for a resource type.
    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn ResourceLifecycle>> {
        self.resources.get(&kind)
    }

    /// Like [`get`](Self::get) but errors for unregistered types.
    pub fn resource(&self, kind: ResourceKind) -> Result<&Arc<dyn ResourceLifecycle>> {
        self.get(kind)
            .ok_or_else(|| Error::UnknownResource(kind.to_string()))
    }

    pub fn available(&self) -> Vec<ResourceKind> {
        self.resources.keys().copied().collect()
    }
}

/// Build the client from `config` and register every resource type on it.
pub fn configure(config: &ProviderConfig) -> Result<ProviderRegistry> {
    let client = AceCloudClient::new(config.client_config())?;
    tracing::info!(
        region = %config.region,
        project_id = %config.project_id,
        "configured acecloud provider"
    );
    Ok(registry(client))
}

/// Register every resource type on an existing client.
pub fn registry(client: AceCloudClient) -> ProviderRegistry {
    let mut resources: HashMap<ResourceKind, Arc<dyn ResourceLifecycle>> = HashMap::new();
    resources.insert(
        ResourceKind::Vm,
        Arc::new(vm::VmResource::new(client.clone())),
    );
    resources.insert(
        ResourceKind::KeyPair,
        Arc::new(key_pair::KeyPairResource::new(client)),
    );
    ProviderRegistry { resources }
}
