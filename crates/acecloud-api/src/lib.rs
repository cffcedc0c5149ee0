//! Typed Rust client for the AceCloud compute API.
//!
//! Covers the subset needed to manage instances (create, get, bulk delete,
//! update/actions) and key pairs (create, get, bulk delete).
//!
//! Every call is a single request bounded by the configured timeout. The
//! client holds no per-request state, so clones can be shared freely across
//! tasks; dropping a returned future aborts the request in flight.

mod action;
mod envelope;
mod types;

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

pub use action::{ActionKind, ActionRoute, VmAction};
pub use envelope::decode_envelope;
pub use types::*;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "x-ace-api-key";
const SERVICE_NAME_HEADER: &str = "x-api-key-service-name";

/// Substrings the backend uses when a target does not exist. It exposes no
/// structured code for this, so matching on the message is all we have.
const NOT_FOUND_MARKERS: &[&str] = &["not found", "404", "does not exist", "resource not found"];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("acecloud api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("acecloud api {endpoint} returned a malformed body: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },

    #[error("acecloud api {endpoint} returned {status}: {message}")]
    Api {
        endpoint: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("acecloud api {endpoint} returned no data")]
    MissingData { endpoint: &'static str },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unknown update action: {0}")]
    UnknownAction(String),
}

impl Error {
    /// Whether this error means the target object is absent.
    ///
    /// Only application errors qualify: an HTTP 404, or a message matching
    /// one of the backend's not-found phrasings.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api {
                status, message, ..
            } => {
                if *status == StatusCode::NOT_FOUND {
                    return true;
                }
                let message = message.to_ascii_lowercase();
                NOT_FOUND_MARKERS.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connection settings shared by every request a client makes.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub region: String,
    pub project_id: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        region: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            region: region.into(),
            project_id: project_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Endpoint family. The gateway routes on the service-name header, so it
/// has to match the collection being called.
#[derive(Debug, Clone, Copy)]
enum Service {
    Instances,
    KeyPairs,
}

impl Service {
    fn collection(self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::KeyPairs => "key-pairs",
        }
    }

    fn header_value(self) -> &'static str {
        match self {
            Self::Instances => "acecloud_vm",
            Self::KeyPairs => "acecloud_keypair",
        }
    }
}

/// Client for the AceCloud REST API.
#[derive(Clone)]
pub struct AceCloudClient {
    base: Url,
    api_key: String,
    region: String,
    project_id: String,
    http: reqwest::Client,
}

impl AceCloudClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| Error::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl {
                url: config.base_url,
                reason: "not a hierarchical url".into(),
            });
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base,
            api_key: config.api_key,
            region: config.region,
            project_id: config.project_id,
            http,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn url(&self, service: Service, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("cloud")
                .push(service.collection())
                .extend(segments);
        }
        url
    }

    /// Send one request and decode its envelope.
    ///
    /// Region and project are always attached as query parameters; `query`
    /// adds per-endpoint extras.
    async fn execute<B, T>(
        &self,
        method: Method,
        service: Service,
        url: Url,
        query: &[(&str, &str)],
        body: Option<&B>,
        endpoint: &'static str,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = body
            .map(|b| serde_json::to_vec(b).map_err(Error::Encode))
            .transpose()?;

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .header(SERVICE_NAME_HEADER, service.header_value())
            .query(&[
                ("region", self.region.as_str()),
                ("project_id", self.project_id.as_str()),
            ])
            .query(query);
        if let Some(payload) = &payload {
            builder = builder.body(payload.clone());
        }
        let request = builder.build()?;

        debug!(
            endpoint,
            method = %request.method(),
            url = %request.url(),
            body = %payload.as_deref().map(String::from_utf8_lossy).unwrap_or_default(),
            "acecloud request"
        );

        let resp = self.http.execute(request).await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        debug!(
            endpoint,
            %status,
            body = %String::from_utf8_lossy(&bytes),
            "acecloud response"
        );

        decode_envelope(endpoint, status, &bytes)
    }

    fn required<T>(data: Option<T>, endpoint: &'static str) -> Result<T> {
        data.ok_or(Error::MissingData { endpoint })
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn create_vm(&self, req: &CreateVmRequest) -> Result<CreatedVm> {
        let url = self.url(Service::Instances, &[]);
        let data = self
            .execute(Method::POST, Service::Instances, url, &[], Some(req), "create vm")
            .await?;
        Self::required(data, "create vm")
    }

    pub async fn get_vm(&self, id: &str) -> Result<VmDetails> {
        let url = self.url(Service::Instances, &[id]);
        let data = self
            .execute::<(), _>(Method::GET, Service::Instances, url, &[], None, "get vm")
            .await?;
        Self::required(data, "get vm")
    }

    /// Delete any number of instances in one call.
    pub async fn delete_vms(&self, ids: &[String]) -> Result<()> {
        let url = self.url(Service::Instances, &[]);
        self.execute::<_, IgnoredAny>(
            Method::DELETE,
            Service::Instances,
            url,
            &[],
            Some(&BulkDeleteRequest::by_id(ids)),
            "delete vms",
        )
        .await?;
        Ok(())
    }

    /// Apply one update action to an instance.
    pub async fn update_vm(&self, id: &str, action: &VmAction) -> Result<()> {
        let route = action.route();
        let url = match route.segment {
            Some(segment) => self.url(Service::Instances, &[id, segment]),
            None => self.url(Service::Instances, &[id]),
        };
        let query: Vec<(&str, &str)> = route.query.into_iter().collect();

        self.execute::<_, IgnoredAny>(
            Method::PUT,
            Service::Instances,
            url,
            &query,
            Some(&action.body()),
            "update vm",
        )
        .await?;
        Ok(())
    }

    // ── Key pairs ────────────────────────────────────────────────────

    pub async fn create_key_pair(&self, req: &CreateKeyPairRequest) -> Result<KeyPair> {
        let url = self.url(Service::KeyPairs, &[]);
        let data = self
            .execute(
                Method::POST,
                Service::KeyPairs,
                url,
                &[],
                Some(req),
                "create key pair",
            )
            .await?;
        Self::required(data, "create key pair")
    }

    pub async fn get_key_pair(&self, id: &str) -> Result<KeyPair> {
        let url = self.url(Service::KeyPairs, &[id]);
        let data = self
            .execute::<(), _>(Method::GET, Service::KeyPairs, url, &[], None, "get key pair")
            .await?;
        Self::required(data, "get key pair")
    }

    pub async fn delete_key_pairs(&self, ids: &[String]) -> Result<()> {
        let url = self.url(Service::KeyPairs, &[]);
        self.execute::<_, IgnoredAny>(
            Method::DELETE,
            Service::KeyPairs,
            url,
            &[],
            Some(&BulkDeleteRequest::by_id(ids)),
            "delete key pairs",
        )
        .await?;
        Ok(())
    }
}
